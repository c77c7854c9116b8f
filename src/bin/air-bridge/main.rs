mod args;
mod http;
mod serial;
mod status;

use std::{
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use air_quality_bridge::{clock::MonotonicClock, ingest::Ingester, sensor::SharedReading};
use anyhow::{Context as _, Result, anyhow};
use args::Args;
use clap::Parser as _;
use tokio::{net::TcpListener, task::JoinError};

use crate::http::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let reading = SharedReading::new();
    let clock = MonotonicClock::start();

    let port = serial::open(&args.serial_port, args.baud_rate)?;
    let ingester = Ingester::new(reading.clone(), clock, args.numeric_policy());
    let stats = ingester.stats();

    let running = Arc::new(AtomicBool::new(true));
    let mut reader = serial::spawn_reader(port, ingester, Arc::clone(&running));

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let state = Arc::new(AppState {
        reading: reading.clone(),
        clock,
        assets_dir: args.assets_dir,
    });

    let result = tokio::select! {
        res = http::serve(listener, state) => res.context("web server stopped"),
        res = &mut reader => match res {
            Ok(res) => res.context("serial reader stopped"),
            Err(e) => Err(anyhow!(e).context("serial reader panicked")),
        },
        _ = status::report_status(
            Duration::from_secs(args.status_interval_secs),
            stats,
            reading,
            clock,
        ) => Ok(()),
        res = tokio::signal::ctrl_c() => {
            log::info!("received shutdown signal");
            res.context("failed to listen for shutdown signal")
        }
    };

    running.store(false, Ordering::Relaxed);
    if !reader.is_finished() {
        // The reader notices the flag within one read timeout.
        if let Some(message) = shutdown_failure(reader.await) {
            log::warn!("{message}");
        }
    }

    result
}

fn shutdown_failure(exit: Result<Result<()>, JoinError>) -> Option<String> {
    match exit {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("serial reader failed during shutdown: {e:#}")),
        Err(e) => Some(format!("serial reader panicked during shutdown: {e}")),
    }
}
