use tracing::warn;

use crate::event::StreamEvent;

/// Incremental frame decoder for the agent's event wire format.
///
/// Chunks arrive with arbitrary boundaries (mid-line, mid-delimiter, or mid
/// multi-byte character). The decoder buffers raw bytes and only emits the
/// text of frames whose blank-line delimiter has been observed, so a partial
/// UTF-8 sequence at a chunk boundary is never decoded early: the delimiter
/// is pure ASCII and UTF-8 continuation bytes cannot match it.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Appends a chunk and returns every frame completed by it, in order.
    ///
    /// Empty frames (consecutive delimiters) are discarded. Any trailing
    /// partial frame stays buffered for the next chunk.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        self.drain_complete_frames()
    }

    /// Best-effort recovery for a producer that ends the stream without a
    /// trailing delimiter: if non-whitespace bytes remain buffered, a
    /// delimiter is synthesized and one final decode pass runs.
    ///
    /// The buffer is empty afterwards either way. This is deliberately
    /// isolated so it can be hardened or removed independently of the normal
    /// decode path.
    pub fn finish(&mut self) -> Vec<String> {
        let residue_is_blank = self.buf.iter().all(|b| b.is_ascii_whitespace());
        if residue_is_blank {
            self.buf.clear();
            return Vec::new();
        }
        warn!(
            buffered = self.buf.len(),
            "stream ended with an unterminated frame; forcing a final decode"
        );
        self.buf.extend_from_slice(b"\n\n");
        let frames = self.drain_complete_frames();
        self.buf.clear();
        frames
    }

    /// Discards any buffered bytes.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn drain_complete_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..idx + delim_len);
            let frame = String::from_utf8_lossy(&frame_bytes);
            if frame.trim().is_empty() {
                continue;
            }
            frames.push(frame.into_owned());
        }
        frames
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

/// Parses one complete frame into typed events.
///
/// A frame may carry several concatenated sub-events; a new sub-block starts
/// at every line beginning with `event:`. Within a sub-block, `event:` sets
/// the kind and each `data:` line appends its remainder to the payload
/// accumulator (payloads may be split across lines). Both accumulators reset
/// at every sub-block boundary. Sub-blocks missing a kind or payload, and
/// sub-blocks whose payload is not valid JSON, are logged and dropped without
/// affecting their siblings.
pub fn parse_frame(frame: &str) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for block in split_sub_blocks(frame) {
        if block.trim().is_empty() {
            continue;
        }
        let mut kind = String::new();
        let mut payload = String::new();
        for raw_line in block.lines() {
            let line = raw_line.trim_end_matches('\r');
            if let Some(rest) = line.strip_prefix("event:") {
                kind = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                payload.push_str(rest);
            }
        }
        if kind.is_empty() || payload.trim().is_empty() {
            warn!(block = %block.trim(), "skipping sub-event without event type or data");
            continue;
        }
        match serde_json::from_str(&payload) {
            Ok(value) => events.push(StreamEvent {
                kind,
                payload: value,
            }),
            Err(err) => {
                warn!(%kind, error = %err, "dropping sub-event with unparseable payload");
            }
        }
    }
    events
}

/// Look-ahead split: one slice per run of lines started by an `event:` line.
/// Leading lines before the first `event:` line form their own (no-op) block.
fn split_sub_blocks(frame: &str) -> Vec<&str> {
    let mut starts = vec![0];
    for (offset, _) in frame.match_indices("event:") {
        let at_line_start = offset == 0 || frame.as_bytes()[offset - 1] == b'\n';
        if at_line_start && offset != 0 {
            starts.push(offset);
        }
    }
    starts.push(frame.len());
    starts
        .windows(2)
        .map(|w| &frame[w[0]..w[1]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_frame_only_after_delimiter() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"event: metadata\ndata: {}").is_empty());
        let frames = decoder.push_chunk(b"\n\n");
        assert_eq!(frames, vec!["event: metadata\ndata: {}".to_string()]);
    }

    #[test]
    fn handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let part1 = b"event: values\ndata: {\"messages\":[{\"type\":\"ai\",\"content\":\"Hel";
        let part2 = b"lo\"}]}\n\n";
        assert!(decoder.push_chunk(part1).is_empty());
        let frames = decoder.push_chunk(part2);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("Hello"));
    }

    #[test]
    fn any_two_way_split_yields_the_same_frames() {
        let input = b"event: metadata\ndata: {\"run\":1}\n\nevent: values\ndata: {\"a\":2}\n\n";
        let mut whole = SseDecoder::default();
        let expected = whole.push_chunk(input);
        assert_eq!(expected.len(), 2);

        for cut in 0..=input.len() {
            let mut decoder = SseDecoder::default();
            let mut frames = decoder.push_chunk(&input[..cut]);
            frames.extend(decoder.push_chunk(&input[cut..]));
            assert_eq!(frames, expected, "split at byte {cut}");
        }
    }

    #[test]
    fn split_mid_multibyte_character_is_preserved() {
        let input = "event: values\ndata: {\"text\":\"héllo\"}\n\n".as_bytes();
        // Cut inside the two-byte 'é'.
        let cut = input.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let mut decoder = SseDecoder::default();
        let mut frames = decoder.push_chunk(&input[..cut]);
        frames.extend(decoder.push_chunk(&input[cut..]));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("héllo"));
    }

    #[test]
    fn consecutive_delimiters_do_not_emit_empty_frames() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"\n\n\n\nevent: a\ndata: 1\n\n\n\n");
        assert_eq!(frames, vec!["event: a\ndata: 1".to_string()]);
    }

    #[test]
    fn supports_crlf_delimiters() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"event: a\r\ndata: 1\r\n\r\nevent: b\r\ndata: 2\r\n\r\n");
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn finish_flushes_unterminated_trailing_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"event: values\ndata: {\"x\":1}").is_empty());
        let frames = decoder.finish();
        assert_eq!(frames, vec!["event: values\ndata: {\"x\":1}".to_string()]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn finish_discards_whitespace_only_residue() {
        let mut decoder = SseDecoder::default();
        decoder.push_chunk(b"event: a\ndata: 1\n\n\n");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn parse_frame_reads_event_and_single_data_line() {
        let events = parse_frame("event: metadata\ndata: {\"run_id\":\"r1\"}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "metadata");
        assert_eq!(events[0].payload["run_id"], "r1");
    }

    #[test]
    fn parse_frame_concatenates_split_data_lines() {
        let events = parse_frame("event: values\ndata: {\"text\":\ndata: \"ok\"}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["text"], "ok");
    }

    #[test]
    fn parse_frame_splits_concatenated_sub_events() {
        let frame = "event: metadata\ndata: {\"run\":1}\nevent: values\ndata: {\"a\":2}";
        let events = parse_frame(frame);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "metadata");
        assert_eq!(events[1].kind, "values");
        assert_eq!(events[1].payload["a"], 2);
    }

    #[test]
    fn parse_frame_does_not_split_on_event_text_mid_line() {
        let frame = "event: values\ndata: {\"note\":\"an event: values marker\"}";
        let events = parse_frame(frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["note"], "an event: values marker");
    }

    #[test]
    fn parse_frame_drops_malformed_sub_event_but_keeps_siblings() {
        let frame = "event: metadata\ndata: {not json\nevent: values\ndata: {\"a\":1}";
        let events = parse_frame(frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "values");
    }

    #[test]
    fn parse_frame_skips_blocks_missing_type_or_payload() {
        assert!(parse_frame("data: {\"orphan\":true}").is_empty());
        assert!(parse_frame("event: metadata").is_empty());
        assert!(parse_frame(": comment line only").is_empty());
    }
}
