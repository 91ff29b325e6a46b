//! Incremental response assembler.
//!
//! Folds the backend's streamed `data: <json>` records into a running
//! (text, cards) pair for one assistant turn. Bytes arrive in arbitrary
//! chunks: a UTF-8 sequence or a record line may be split anywhere, so both
//! are reassembled across chunk boundaries before a record is interpreted.

use log::{debug, warn};

use crate::models::stream::{CardsData, StreamRecord};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

const CARDS_ANNOUNCEMENT: &str =
    "\n\n✨ Here are your personalized credit card recommendations:";

/// Shown when the user cancels an in-flight request.
pub const CANCELLED_MESSAGE: &str = "Request cancelled";

/// Shown on any transport-level failure.
pub const FAILURE_MESSAGE: &str = "❌ Something went wrong. Please try again.";

/// What a chunk of bytes did to the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkDisposition {
    /// Keep reading.
    Continue,
    /// The `[DONE]` sentinel was seen; stop reading, ignore buffered data.
    Done,
    /// An `error` record was seen; stop reading, the error text is appended.
    BackendError,
}

#[derive(Debug, Default)]
pub struct ResponseAssembler {
    /// Trailing bytes of an incomplete UTF-8 sequence from the last chunk.
    utf8_carry: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    line_buffer: String,
    text: String,
    cards: Option<CardsData>,
    finished: bool,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated display text so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cards(&self) -> Option<&CardsData> {
        self.cards.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one chunk of raw bytes from the response body.
    ///
    /// Every complete record line in the chunk is applied in order. Once the
    /// sentinel or an error record is hit, the rest of the chunk is dropped
    /// and the assembler refuses further input.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> ChunkDisposition {
        if self.finished {
            return ChunkDisposition::Done;
        }

        let decoded = self.decode(chunk);
        self.line_buffer.push_str(&decoded);

        while let Some(pos) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=pos).collect();
            let disposition = self.process_line(line.trim_end_matches(&['\n', '\r'][..]));
            if disposition != ChunkDisposition::Continue {
                self.line_buffer.clear();
                return disposition;
            }
        }

        ChunkDisposition::Continue
    }

    /// Flush a trailing unterminated line once the stream has ended.
    pub fn finish(&mut self) -> ChunkDisposition {
        if self.finished {
            return ChunkDisposition::Done;
        }
        if self.line_buffer.is_empty() {
            return ChunkDisposition::Continue;
        }
        let line = std::mem::take(&mut self.line_buffer);
        self.process_line(line.trim_end_matches('\r'))
    }

    /// Decode a chunk, carrying an incomplete multi-byte sequence over to
    /// the next chunk instead of mangling it.
    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_carry);
        bytes.extend_from_slice(chunk);

        match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_string(),
            Err(err) if err.error_len().is_none() => {
                // Valid prefix, incomplete suffix: hold the tail back.
                let valid = err.valid_up_to();
                self.utf8_carry = bytes[valid..].to_vec();
                String::from_utf8_lossy(&bytes[..valid]).into_owned()
            }
            Err(err) => {
                warn!("invalid UTF-8 in response stream at byte {}", err.valid_up_to());
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }

    fn process_line(&mut self, line: &str) -> ChunkDisposition {
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return ChunkDisposition::Continue;
        };
        let payload = rest.trim();

        if payload == DONE_SENTINEL {
            self.finished = true;
            return ChunkDisposition::Done;
        }

        match serde_json::from_str::<StreamRecord>(payload) {
            Ok(record) => self.apply(record),
            Err(err) => {
                // A single corrupt record must not abort the stream.
                warn!("failed to parse stream record: {} (payload: {})", err, payload);
                ChunkDisposition::Continue
            }
        }
    }

    fn apply(&mut self, record: StreamRecord) -> ChunkDisposition {
        match record {
            StreamRecord::Status(status) => {
                self.text.push_str(&format!("*{}*\n\n", status));
            }
            StreamRecord::Message(text) => {
                self.text.push_str(&text);
            }
            StreamRecord::Cards(cards) => {
                self.cards = Some(cards);
                self.text.push_str(CARDS_ANNOUNCEMENT);
            }
            StreamRecord::Error(message) => {
                self.text.push_str(&format!("\n\n❌ Error: {}", message));
                self.finished = true;
                return ChunkDisposition::BackendError;
            }
            StreamRecord::Unknown => {
                debug!("skipping stream record with unknown type");
            }
        }
        ChunkDisposition::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> Vec<u8> {
        format!("data: {}\n", json).into_bytes()
    }

    #[test]
    fn accumulates_records_in_order() {
        let mut asm = ResponseAssembler::new();
        assert_eq!(
            asm.push_chunk(&record(r#"{"type":"status","content":"Analyzing"}"#)),
            ChunkDisposition::Continue
        );
        assert_eq!(
            asm.push_chunk(&record(r#"{"type":"message","content":"Top pick: Card A"}"#)),
            ChunkDisposition::Continue
        );
        assert_eq!(
            asm.push_chunk(&record(
                r#"{"type":"cards","content":{"matches":[{"card_name":"Card A","bank":"Acme"}]}}"#
            )),
            ChunkDisposition::Continue
        );
        assert_eq!(asm.push_chunk(b"data: [DONE]\n"), ChunkDisposition::Done);

        assert_eq!(
            asm.text(),
            "*Analyzing*\n\nTop pick: Card A\n\n\u{2728} Here are your personalized credit card recommendations:"
        );
        let cards = asm.cards().expect("cards payload");
        assert_eq!(cards.matches.len(), 1);
        assert_eq!(cards.matches[0].card_name, "Card A");
        assert!(asm.is_finished());
    }

    #[test]
    fn done_sentinel_drops_rest_of_chunk() {
        let mut asm = ResponseAssembler::new();
        let chunk = concat!(
            "data: {\"type\":\"message\",\"content\":\"first\"}\n",
            "data: [DONE]\n",
            "data: {\"type\":\"message\",\"content\":\"ignored\"}\n",
        );
        assert_eq!(asm.push_chunk(chunk.as_bytes()), ChunkDisposition::Done);
        assert_eq!(asm.text(), "first");
        // Later chunks are ignored too.
        assert_eq!(
            asm.push_chunk(&record(r#"{"type":"message","content":"late"}"#)),
            ChunkDisposition::Done
        );
        assert_eq!(asm.text(), "first");
    }

    #[test]
    fn malformed_record_is_skipped() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(b"data: {\"type\":\"message\",\"content\":\"before \"}\n");
        asm.push_chunk(b"data: {\"type\":\"message\",\"cont\n");
        asm.push_chunk(b"data: {\"type\":\"message\",\"content\":\"after\"}\n");
        assert_eq!(asm.text(), "before after");
    }

    #[test]
    fn error_record_finishes_and_stops_processing() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(&record(r#"{"type":"message","content":"partial"}"#));
        let chunk = concat!(
            "data: {\"type\":\"error\",\"content\":\"backend exploded\"}\n",
            "data: {\"type\":\"message\",\"content\":\"ignored\"}\n",
        );
        assert_eq!(
            asm.push_chunk(chunk.as_bytes()),
            ChunkDisposition::BackendError
        );
        assert_eq!(asm.text(), "partial\n\n\u{274c} Error: backend exploded");
        assert!(asm.is_finished());
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let mut asm = ResponseAssembler::new();
        let line = "data: {\"type\":\"message\",\"content\":\"caf\u{e9}\"}\n".as_bytes();
        // Split in the middle of the two-byte 'é'.
        let split = line.len() - 4;
        asm.push_chunk(&line[..split]);
        asm.push_chunk(&line[split..]);
        assert_eq!(asm.text(), "caf\u{e9}");
    }

    #[test]
    fn record_split_across_chunks_is_reassembled() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(b"data: {\"type\":\"mess");
        asm.push_chunk(b"age\",\"content\":\"hello\"}\ndata: [DONE]\n");
        assert_eq!(asm.text(), "hello");
        assert!(asm.is_finished());
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(b"event: noise\n\n: comment\n");
        asm.push_chunk(&record(r#"{"type":"message","content":"ok"}"#));
        assert_eq!(asm.text(), "ok");
    }

    #[test]
    fn finish_flushes_unterminated_sentinel() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(b"data: [DONE]");
        assert!(!asm.is_finished());
        assert_eq!(asm.finish(), ChunkDisposition::Done);
        assert!(asm.is_finished());
    }

    #[test]
    fn later_cards_record_overwrites_earlier() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(&record(
            r#"{"type":"cards","content":{"matches":[{"card_name":"Old","bank":"A"}]}}"#,
        ));
        asm.push_chunk(&record(
            r#"{"type":"cards","content":{"matches":[{"card_name":"New","bank":"B"}]}}"#,
        ));
        assert_eq!(asm.cards().unwrap().matches[0].card_name, "New");
    }

    #[test]
    fn crlf_framed_records_parse() {
        let mut asm = ResponseAssembler::new();
        asm.push_chunk(b"data: {\"type\":\"message\",\"content\":\"win\"}\r\n");
        assert_eq!(asm.text(), "win");
    }
}
