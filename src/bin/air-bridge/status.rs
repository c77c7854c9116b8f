use std::{sync::Arc, time::Duration};

use air_quality_bridge::{clock::Clock, ingest::IngestStats, sensor::SharedReading};
use tokio::time::{MissedTickBehavior, interval};

pub async fn report_status<C: Clock>(
    period: Duration,
    stats: Arc<IngestStats>,
    reading: SharedReading,
    clock: C,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut last_bytes = stats.counts().bytes;
    loop {
        ticker.tick().await;

        let counts = stats.counts();
        let staleness_ms = reading.lock().staleness_ms(clock.now_ms());
        log::info!("{}", status_line(counts.bytes - last_bytes, staleness_ms));
        last_bytes = counts.bytes;
    }
}

fn status_line(bytes_since: u64, staleness_ms: Option<u64>) -> String {
    match staleness_ms {
        Some(ms) => format!(
            "serial received: {bytes_since} bytes, last update: {} seconds ago",
            ms / 1000
        ),
        None => format!("serial received: {bytes_since} bytes, no update yet"),
    }
}
