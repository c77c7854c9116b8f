use std::{
    io::{ErrorKind, Read},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use air_quality_bridge::{clock::Clock, ingest::Ingester};
use anyhow::{Context as _, Result, bail};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 64;

pub fn open(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("failed to open serial port: {path}"))?;

    log::info!("opened serial port: {path} at {baud_rate} baud");

    Ok(port)
}

/// Drains `port` into `ingester` until `running` is cleared.
///
/// A read timeout means no bytes are waiting. End of stream is an error,
/// since a serial link never closes on its own.
pub fn pump<R, C>(port: &mut R, ingester: &mut Ingester<C>, running: &AtomicBool) -> Result<()>
where
    R: Read + ?Sized,
    C: Clock,
{
    let mut buf = [0u8; READ_CHUNK];

    while running.load(Ordering::Relaxed) {
        let n = match port.read(&mut buf) {
            Ok(0) => bail!("serial port closed"),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read from serial port"),
        };

        ingester.feed(&buf[..n]);
    }

    Ok(())
}

pub fn spawn_reader<C>(
    mut port: Box<dyn SerialPort>,
    mut ingester: Ingester<C>,
    running: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<Result<()>>
where
    C: Clock + Send + 'static,
{
    tokio::task::spawn_blocking(move || pump(&mut port, &mut ingester, &running))
}
