use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    clock::Clock,
    command::{NumericPolicy, Rejection, parse_command},
    frame::{FrameEvent, FrameReader, Message},
    sensor::SharedReading,
};

/// Running totals, readable from other threads while ingestion continues.
#[derive(Debug, Default)]
pub struct IngestStats {
    bytes: AtomicU64,
    messages: AtomicU64,
    accepted: AtomicU64,
    unknown: AtomicU64,
    out_of_range: AtomicU64,
    malformed: AtomicU64,
    overflows: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub bytes: u64,
    pub messages: u64,
    pub accepted: u64,
    pub unknown: u64,
    pub out_of_range: u64,
    pub malformed: u64,
    pub overflows: u64,
}

impl IngestStats {
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            bytes: self.bytes.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            out_of_range: self.out_of_range.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Serial bytes in, validated values out to the shared reading.
#[derive(Debug)]
pub struct Ingester<C> {
    reader: FrameReader,
    reading: SharedReading,
    clock: C,
    policy: NumericPolicy,
    stats: Arc<IngestStats>,
}

impl<C: Clock> Ingester<C> {
    pub fn new(reading: SharedReading, clock: C, policy: NumericPolicy) -> Self {
        Self {
            reader: FrameReader::new(),
            reading,
            clock,
            policy,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.stats
            .bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        for &byte in bytes {
            match self.reader.push(byte) {
                Some(FrameEvent::Message(message)) => {
                    self.handle_message(&message);
                }
                Some(FrameEvent::Overflow) => {
                    IngestStats::bump(&self.stats.overflows);
                    log::warn!("buffer overflow, clearing");
                }
                None => {}
            }
        }
    }

    /// Applies one complete message. Returns whether a field was updated.
    pub fn handle_message(&mut self, message: &Message) -> bool {
        IngestStats::bump(&self.stats.messages);
        log::debug!("complete message received: '{message}'");

        let command = match parse_command(message.as_str(), self.policy) {
            Ok(c) => c,
            Err(rejection) => {
                let counter = match rejection {
                    Rejection::UnknownCommand(_) => &self.stats.unknown,
                    Rejection::OutOfRange { .. } => &self.stats.out_of_range,
                    Rejection::MalformedValue { .. } => &self.stats.malformed,
                };
                IngestStats::bump(counter);
                log::warn!("{rejection}");
                return false;
            }
        };

        let now_ms = self.clock.now_ms();
        if !self.reading.lock().set(command.field, command.value, now_ms) {
            // parse_command already checked the range, the store checks it again.
            IngestStats::bump(&self.stats.out_of_range);
            return false;
        }

        IngestStats::bump(&self.stats.accepted);
        log::info!(
            "{} updated: {} {}",
            command.field,
            command.value,
            command.field.unit()
        );

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, frame::DELIMITER, sensor::Field};

    fn framed(text: &str) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.extend_from_slice(&[DELIMITER; 3]);
        bytes
    }

    fn ingester(policy: NumericPolicy) -> (Ingester<ManualClock>, SharedReading, ManualClock) {
        let reading = SharedReading::new();
        let clock = ManualClock::new(1_000);
        let ingester = Ingester::new(reading.clone(), clock.clone(), policy);
        (ingester, reading, clock)
    }

    #[test]
    fn accepted_message_updates_field_and_time() {
        let (mut ingester, reading, _) = ingester(NumericPolicy::Strict);
        ingester.feed(&framed("co2V.val=523"));

        let r = reading.read();
        assert_eq!(r.get(Field::Co2), 523);
        assert_eq!(r.last_update(), Some(1_000));
    }

    #[test]
    fn repeated_message_is_idempotent_but_advances_time() {
        let (mut ingester, reading, clock) = ingester(NumericPolicy::Strict);
        ingester.feed(&framed("tvocV.val=88"));
        clock.advance(250);
        ingester.feed(&framed("tvocV.val=88"));

        let r = reading.read();
        assert_eq!(r.get(Field::Tvoc), 88);
        assert_eq!(r.last_update(), Some(1_250));
        assert_eq!(ingester.stats().counts().accepted, 2);
    }

    #[test]
    fn rejections_leave_store_untouched() {
        let (mut ingester, reading, clock) = ingester(NumericPolicy::Strict);
        ingester.feed(&framed("humV.val=40"));
        clock.advance(10);
        ingester.feed(&framed("humV.val=150"));
        ingester.feed(&framed("foo.val=1"));
        ingester.feed(&framed("humV.val=wet"));

        let r = reading.read();
        assert_eq!(r.get(Field::Humidity), 40);
        assert_eq!(r.last_update(), Some(1_000));

        let counts = ingester.stats().counts();
        assert_eq!(counts.messages, 4);
        assert_eq!(counts.accepted, 1);
        assert_eq!(counts.out_of_range, 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.malformed, 1);
    }

    #[test]
    fn lenient_policy_reads_leading_digits() {
        let (mut ingester, reading, _) = ingester(NumericPolicy::Lenient);
        ingester.feed(&framed("pm25V.val=17ug"));
        ingester.feed(&framed("o3V.val=none"));

        let r = reading.read();
        assert_eq!(r.get(Field::Pm25), 17);
        assert_eq!(r.get(Field::O3), 0);
        assert_eq!(ingester.stats().counts().accepted, 2);
    }

    #[test]
    fn counts_bytes_and_overflows() {
        let (mut ingester, reading, _) = ingester(NumericPolicy::Strict);
        ingester.feed(&[b'#'; 150]);
        ingester.feed(&[DELIMITER; 3]);

        let counts = ingester.stats().counts();
        assert_eq!(counts.bytes, 153);
        assert_eq!(counts.overflows, 1);
        // The 49 characters left after the reset form one unknown message.
        assert_eq!(counts.unknown, 1);
        assert_eq!(reading.read(), Default::default());
    }

    #[test]
    fn other_fields_keep_their_values() {
        let (mut ingester, reading, _) = ingester(NumericPolicy::Strict);
        ingester.feed(&framed("tempV.val=21"));
        ingester.feed(&framed("humV.val=55"));
        ingester.feed(&framed("tempV.val=22"));

        let r = reading.read();
        assert_eq!(r.get(Field::Temperature), 22);
        assert_eq!(r.get(Field::Humidity), 55);
    }
}
