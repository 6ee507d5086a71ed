use std::time::Instant;

use bytes::{Bytes, BytesMut};
use memchr::memmem;

use crate::shared_types::Endpoint;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_CAPACITY: usize = 4096;
pub const DEFAULT_SLACK: usize = 100;

// -----------------------------------------------------------------------------
// ----- Frame -----------------------------------------------------------------

/// One payload extracted between two delimiter boundaries. Immutable once
/// produced; the delimiter itself is not part of the payload.
#[derive(Debug, Clone)]
pub struct Frame {
    pub endpoint: Endpoint,
    pub payload: Bytes,
    pub captured_at: Instant,
}

// -----------------------------------------------------------------------------
// ----- FeedResult ------------------------------------------------------------

#[derive(Debug)]
pub struct FeedResult {
    pub frames: Vec<Frame>,
    /// The accumulator ran past `capacity - slack` without a delimiter and
    /// was discarded. The caller must count this; data loss is accepted but
    /// never silent.
    pub overflow: bool,
}

// -----------------------------------------------------------------------------
// ----- FrameAssembler --------------------------------------------------------

/// Per-endpoint byte accumulator. Fed raw reads in arbitrary chunk sizes,
/// emits complete frames per the endpoint's delimiter rule; partial data
/// persists across calls.
#[derive(Debug)]
pub struct FrameAssembler {
    endpoint: Endpoint,
    delimiters: Vec<&'static [u8]>,
    accumulator: BytesMut,
    capacity: usize,
    slack: usize,
}

// -----------------------------------------------------------------------------
// ----- FrameAssembler: Static ------------------------------------------------

impl FrameAssembler {
    /// Ordered list of candidate delimiters. A single delimiter is the
    /// common case; diagnostic peers that interleave two terminator shapes
    /// in one stream pass both.
    pub fn new(
        endpoint: Endpoint,
        delimiters: Vec<&'static [u8]>,
        capacity: usize,
        slack: usize,
    ) -> Self {
        debug_assert!(!delimiters.is_empty(), "at least one delimiter");
        debug_assert!(slack < capacity, "slack must leave usable capacity");

        Self {
            endpoint,
            delimiters,
            accumulator: BytesMut::with_capacity(capacity),
            capacity,
            slack,
        }
    }

    /// ACM side: bare newline terminator.
    pub fn front_end(capacity: usize, slack: usize) -> Self {
        Self::new(Endpoint::FrontEnd, vec![b"\n"], capacity, slack)
    }

    /// STM32 side: CRLF terminator.
    pub fn back_end(capacity: usize, slack: usize) -> Self {
        Self::new(Endpoint::BackEnd, vec![b"\r\n"], capacity, slack)
    }
}

// -----------------------------------------------------------------------------
// ----- FrameAssembler: Public ------------------------------------------------

impl FrameAssembler {
    pub fn feed(&mut self, input: &[u8]) -> FeedResult {
        self.accumulator.extend_from_slice(input);

        let mut frames = Vec::new();
        while let Some((offset, delimiter_len)) = self.next_boundary() {
            let mut line = self.accumulator.split_to(offset + delimiter_len);
            line.truncate(offset);

            frames.push(Frame {
                endpoint: self.endpoint,
                payload: line.freeze(),
                captured_at: Instant::now(),
            });
        }

        let overflow = self.accumulator.len() > self.capacity.saturating_sub(self.slack);
        if overflow {
            self.accumulator.clear();
        }

        FeedResult { frames, overflow }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Bytes currently buffered without a frame boundary.
    pub fn pending_len(&self) -> usize {
        self.accumulator.len()
    }
}

// -----------------------------------------------------------------------------
// ----- FrameAssembler: Private -----------------------------------------------

impl FrameAssembler {
    /// Leftmost match across all candidate delimiters wins; on an offset tie
    /// the longest delimiter wins, so a line ending in `\n>` is not consumed
    /// early by a bare `\n` candidate.
    fn next_boundary(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;

        for delimiter in &self.delimiters {
            let Some(offset) = memmem::find(&self.accumulator, delimiter) else {
                continue;
            };

            best = match best {
                None => Some((offset, delimiter.len())),
                Some((o, l)) if offset < o || (offset == o && delimiter.len() > l) => {
                    Some((offset, delimiter.len()))
                }
                keep => keep,
            };
        }

        best
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_payloads(assembler: &mut FrameAssembler, input: &[u8], chunk: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for piece in input.chunks(chunk.max(1)) {
            let result = assembler.feed(piece);
            out.extend(result.frames.into_iter().map(|f| f.payload.to_vec()));
        }
        out
    }

    #[test]
    fn splits_on_newline() {
        let mut assembler = FrameAssembler::front_end(DEFAULT_CAPACITY, DEFAULT_SLACK);
        let result = assembler.feed(b"ver\nsta\n");

        let payloads: Vec<_> = result.frames.iter().map(|f| f.payload.as_ref()).collect();
        assert_eq!(payloads, vec![b"ver".as_ref(), b"sta".as_ref()]);
        assert!(!result.overflow);
    }

    #[test]
    fn chunking_does_not_affect_output() {
        let input = b"first\nsecond\npartial-tail";

        for chunk in [1usize, 3, input.len()] {
            let mut assembler = FrameAssembler::front_end(DEFAULT_CAPACITY, DEFAULT_SLACK);
            let payloads = collect_payloads(&mut assembler, input, chunk);

            assert_eq!(
                payloads,
                vec![b"first".to_vec(), b"second".to_vec()],
                "chunk size {chunk}"
            );
            assert_eq!(assembler.pending_len(), b"partial-tail".len());
        }
    }

    #[test]
    fn crlf_delimiter_keeps_cr_out_of_payload() {
        let mut assembler = FrameAssembler::back_end(DEFAULT_CAPACITY, DEFAULT_SLACK);
        let result = assembler.feed(b"{\"MsgType\":\"M5\"}\r\nrest");

        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.frames[0].payload.as_ref(), b"{\"MsgType\":\"M5\"}");
        assert_eq!(assembler.pending_len(), 4);
    }

    #[test]
    fn partial_frame_persists_across_calls() {
        let mut assembler = FrameAssembler::back_end(DEFAULT_CAPACITY, DEFAULT_SLACK);

        assert!(assembler.feed(b"{\"MsgType\"").frames.is_empty());
        assert!(assembler.feed(b":\"M4\"}\r").frames.is_empty());

        let result = assembler.feed(b"\n");
        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.frames[0].payload.as_ref(), b"{\"MsgType\":\"M4\"}");
    }

    #[test]
    fn overflow_discards_and_recovers() {
        let capacity = 256;
        let mut assembler = FrameAssembler::front_end(capacity, 16);

        let result = assembler.feed(&vec![b'x'; capacity]);
        assert!(result.frames.is_empty());
        assert!(result.overflow);
        assert_eq!(assembler.pending_len(), 0);

        // The discard must not poison subsequent valid traffic.
        let result = assembler.feed(b"ver\n");
        assert!(!result.overflow);
        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.frames[0].payload.as_ref(), b"ver");
    }

    #[test]
    fn overflow_reported_once_per_discard() {
        let capacity = 64;
        let mut assembler = FrameAssembler::front_end(capacity, 8);

        let mut overflows = 0;
        for piece in vec![b'x'; capacity].chunks(7) {
            if assembler.feed(piece).overflow {
                overflows += 1;
            }
        }

        assert_eq!(overflows, 1);
    }

    #[test]
    fn two_delimiters_leftmost_offset_wins() {
        let mut assembler = FrameAssembler::new(
            Endpoint::BackEnd,
            vec![b"\r\n", b"\n>"],
            DEFAULT_CAPACITY,
            DEFAULT_SLACK,
        );

        let result = assembler.feed(b"alpha\r\nbeta\n>gamma\r\n");
        let payloads: Vec<_> = result.frames.iter().map(|f| f.payload.as_ref()).collect();
        assert_eq!(
            payloads,
            vec![b"alpha".as_ref(), b"beta".as_ref(), b"gamma".as_ref()]
        );
    }

    #[test]
    fn tie_at_same_offset_takes_longest_delimiter() {
        // "\n" alone would split "ok\n>" into "ok" + leftover ">", corrupting
        // the next line. The longer "\n>" candidate must win the tie.
        let mut assembler = FrameAssembler::new(
            Endpoint::BackEnd,
            vec![b"\n", b"\n>"],
            DEFAULT_CAPACITY,
            DEFAULT_SLACK,
        );

        let result = assembler.feed(b"ok\n>next\n");
        let payloads: Vec<_> = result.frames.iter().map(|f| f.payload.as_ref()).collect();
        assert_eq!(payloads, vec![b"ok".as_ref(), b"next".as_ref()]);
        assert_eq!(assembler.pending_len(), 0);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
