use std::fmt;

pub const DELIMITER: u8 = 0xff;

/// Consecutive delimiter bytes that end a message.
pub const TERMINATOR_RUN: u8 = 3;

pub const MAX_MESSAGE_LEN: usize = 100;

/// One complete message, printable ASCII only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(String);

impl Message {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Message(Message),
    /// The buffer grew past [`MAX_MESSAGE_LEN`] and was thrown away.
    Overflow,
}

/// Reassembles `FF FF FF` terminated messages from a serial byte stream.
#[derive(Debug)]
pub struct FrameReader {
    buffer: String,
    delimiter_run: u8,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(MAX_MESSAGE_LEN + 1),
            delimiter_run: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        let mut event = None;

        if byte == DELIMITER {
            self.delimiter_run += 1;
            if self.delimiter_run >= TERMINATOR_RUN {
                if !self.buffer.is_empty() {
                    let text = std::mem::replace(
                        &mut self.buffer,
                        String::with_capacity(MAX_MESSAGE_LEN + 1),
                    );
                    event = Some(FrameEvent::Message(Message(text)));
                }
                self.delimiter_run = 0;
            }
        } else {
            self.delimiter_run = 0;
            if is_printable(byte) {
                self.buffer.push(byte as char);
            }
        }

        if self.buffer.len() > MAX_MESSAGE_LEN {
            self.buffer.clear();
            self.delimiter_run = 0;
            event = Some(FrameEvent::Overflow);
        }

        event
    }

    pub fn push_all(&mut self, bytes: &[u8]) -> Vec<FrameEvent> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Characters of the message currently being assembled.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    const END: [u8; 3] = [DELIMITER; 3];

    fn messages(events: Vec<FrameEvent>) -> Vec<String> {
        events
            .into_iter()
            .filter_map(|e| match e {
                FrameEvent::Message(m) => Some(m.as_str().to_owned()),
                FrameEvent::Overflow => None,
            })
            .collect()
    }

    fn framed(text: &str) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.extend_from_slice(&END);
        bytes
    }

    #[test]
    fn emits_on_triple_delimiter() {
        let mut reader = FrameReader::new();
        let events = reader.push_all(&framed("co2V.val=523"));
        assert_eq!(messages(events), vec!["co2V.val=523"]);
        assert_eq!(reader.pending(), "");
    }

    #[test]
    fn bytes_may_arrive_in_pieces() {
        let mut reader = FrameReader::new();
        assert!(reader.push_all(b"humV.").is_empty());
        assert!(reader.push_all(b"val=4").is_empty());
        assert!(reader.push_all(&[DELIMITER, DELIMITER]).is_empty());
        assert_eq!(
            messages(reader.push_all(&[b'2', DELIMITER, DELIMITER, DELIMITER])),
            vec!["humV.val=42"]
        );
    }

    #[test]
    fn single_stray_delimiter_does_not_split() {
        let mut reader = FrameReader::new();
        let mut bytes = b"temp".to_vec();
        bytes.push(DELIMITER);
        bytes.extend_from_slice(&framed("V.val=21"));
        assert_eq!(messages(reader.push_all(&bytes)), vec!["tempV.val=21"]);
    }

    #[test]
    fn two_delimiters_then_text_keeps_accumulating() {
        let mut reader = FrameReader::new();
        let mut bytes = b"ab".to_vec();
        bytes.extend_from_slice(&[DELIMITER, DELIMITER]);
        bytes.extend_from_slice(&framed("cd"));
        assert_eq!(messages(reader.push_all(&bytes)), vec!["abcd"]);
    }

    #[test]
    fn delimiter_run_without_content_is_a_no_op() {
        let mut reader = FrameReader::new();
        assert!(reader.push_all(&[DELIMITER; 9]).is_empty());
        assert_eq!(messages(reader.push_all(&framed("x"))), vec!["x"]);
    }

    #[test]
    fn long_delimiter_run_after_message() {
        // The fourth and fifth 0xFF start a fresh count.
        let mut reader = FrameReader::new();
        let mut bytes = framed("a");
        bytes.extend_from_slice(&[DELIMITER, DELIMITER]);
        bytes.extend_from_slice(&framed("b"));
        assert_eq!(messages(reader.push_all(&bytes)), vec!["a", "b"]);
    }

    #[test]
    fn drops_non_printable_bytes() {
        let mut reader = FrameReader::new();
        let mut bytes = vec![0x00, b'o', b'3', b'\r', b'\n', 0x80, 0x1b, 0x7f];
        bytes.extend_from_slice(&framed("V.val=7"));
        assert_eq!(messages(reader.push_all(&bytes)), vec!["o3V.val=7"]);
    }

    #[test]
    fn overflow_clears_at_the_101st_character() {
        let mut reader = FrameReader::new();
        for _ in 0..MAX_MESSAGE_LEN {
            assert_eq!(reader.push(b'a'), None);
        }
        assert_eq!(reader.pending().len(), MAX_MESSAGE_LEN);
        assert_eq!(reader.push(b'a'), Some(FrameEvent::Overflow));
        assert_eq!(reader.pending(), "");
    }

    #[test]
    fn overflow_run_never_emits_a_message() {
        let mut reader = FrameReader::new();
        let events = reader.push_all(&[b'z'; 150]);
        assert_eq!(events, vec![FrameEvent::Overflow]);
        assert_eq!(reader.pending().len(), 49);
    }

    #[test]
    fn frames_normally_after_overflow() {
        let mut reader = FrameReader::new();
        let mut bytes = vec![b'q'; MAX_MESSAGE_LEN];
        bytes.extend_from_slice(&[DELIMITER, DELIMITER]);
        bytes.push(b'q');
        assert_eq!(reader.push_all(&bytes), vec![FrameEvent::Overflow]);
        assert_eq!(reader.pending(), "");

        // Nothing from the discarded run leaks into the next message.
        assert_eq!(
            messages(reader.push_all(&framed("co2V.val=1"))),
            vec!["co2V.val=1"]
        );
    }

    #[test]
    fn exactly_max_length_message_is_emitted() {
        let mut reader = FrameReader::new();
        let text = "x".repeat(MAX_MESSAGE_LEN);
        assert_eq!(messages(reader.push_all(&framed(&text))), vec![text]);
    }

    #[test]
    fn arbitrary_noise_stays_bounded() {
        // Deterministic xorshift stream with plenty of 0xFF and control bytes.
        let mut reader = FrameReader::new();
        let mut state: u32 = 0x9e37_79b9;
        for _ in 0..200_000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let byte = match state % 7 {
                0 => DELIMITER,
                1 => 0x00,
                _ => (state >> 8) as u8,
            };
            if let Some(FrameEvent::Message(m)) = reader.push(byte) {
                assert!(!m.as_str().is_empty());
                assert!(m.as_str().len() <= MAX_MESSAGE_LEN);
                assert!(m.as_str().bytes().all(is_printable));
            }
            assert!(reader.pending().len() <= MAX_MESSAGE_LEN);
        }
    }
}
