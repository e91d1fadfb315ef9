// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Incremental SSE demultiplexer
//!
//! Consumes a chunked byte stream with no guaranteed line or event
//! boundaries, reassembles lines, groups them into logical SSE events, and
//! yields one `data:` payload per event. A chunk may end mid-line,
//! mid-character, or mid-event; a single chunk may carry several events.
//!
//! Per-line classification:
//! - blank line: dispatch the pending event (no-op when nothing is pending)
//! - `data:` field: strip the prefix and one leading space, append to the
//!   pending event followed by a newline (the SSE multi-line join rule)
//! - `:` comment: discarded
//! - any other field (`event:`, `id:`, `retry:`): ignored
//!
//! At stream end, a remaining line without a trailing newline is still
//! processed, and a pending event is dispatched exactly once.

use futures::Stream;
use futures_util::StreamExt;

use crate::error::{ApiError, MaresError, Result};

/// Byte-chunk to event-payload state machine
///
/// Holds the unconsumed tail of decoded bytes not yet split into lines and
/// the accumulated `data:` content not yet dispatched. Both buffers drain on
/// every dispatch, so they stay bounded in normal operation.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Undecoded tail of a multi-byte character split across chunks
    partial_utf8: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    line_buffer: String,
    /// Accumulated `data:` content for the in-flight event
    event_data: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte chunk, returning every complete event payload it unlocks
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk);
        self.line_buffer.push_str(&text);

        let mut payloads = Vec::new();
        while let Some(pos) = self.line_buffer.find('\n') {
            let rest = self.line_buffer.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.line_buffer, rest);
            line.pop(); // the newline itself
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(payload) = self.handle_line(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush at stream end: process a final unterminated line, then dispatch
    /// a still-pending event (streams may end without a closing blank line)
    pub fn finish(&mut self) -> Vec<String> {
        if !self.partial_utf8.is_empty() {
            // A truncated character at stream end decodes lossily
            let tail = std::mem::take(&mut self.partial_utf8);
            self.line_buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let mut payloads = Vec::new();
        if !self.line_buffer.is_empty() {
            let mut line = std::mem::take(&mut self.line_buffer);
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(payload) = self.handle_line(&line) {
                payloads.push(payload);
            }
        }
        if let Some(payload) = self.take_event() {
            payloads.push(payload);
        }
        payloads
    }

    /// Incremental UTF-8 decode, carrying an incomplete trailing character
    /// over to the next chunk. Invalid sequences decode as U+FFFD.
    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = &bytes[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, rest) = input.split_at(error.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(invalid_len) => {
                            out.push('\u{FFFD}');
                            input = &rest[invalid_len..];
                        }
                        None => {
                            // Incomplete character: wait for the next chunk
                            self.partial_utf8 = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.trim().is_empty() {
            return self.take_event();
        }
        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            self.event_data.push_str(rest);
            self.event_data.push('\n');
        } else if line.starts_with(':') {
            // Comment line, ignore
        }
        // Other SSE fields (event, id, retry) are not acted on
        None
    }

    /// Dispatch the pending event: strip exactly one trailing newline and
    /// clear the buffer. Nothing pending means nothing dispatched.
    fn take_event(&mut self) -> Option<String> {
        if self.event_data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.event_data);
        if data.ends_with('\n') {
            data.pop();
        }
        Some(data)
    }
}

/// Adapt a raw byte-chunk stream into a stream of SSE event payloads
///
/// Transport errors end the stream; the decoder's final flush runs only when
/// the input ends cleanly.
pub fn payload_stream<S, B, E>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    async_stream::stream! {
        let mut decoder = SseDecoder::new();
        futures_util::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for payload in decoder.feed(bytes.as_ref()) {
                        yield Ok(payload);
                    }
                }
                Err(error) => {
                    yield Err(MaresError::Api(ApiError::StreamError(error.to_string())));
                    return;
                }
            }
        }
        for payload in decoder.finish() {
            yield Ok(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut SseDecoder, chunks: &[&[u8]]) -> Vec<String> {
        let mut payloads = Vec::new();
        for chunk in chunks {
            payloads.extend(decoder.feed(chunk));
        }
        payloads.extend(decoder.finish());
        payloads
    }

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: {\"a\":1}\n\n"]);
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: one\n\ndata: two\n\ndata: three\n\n"]);
        assert_eq!(payloads, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"da", b"ta: {\"a\"", b":1}\n", b"\n"]);
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_byte_by_byte_delivery() {
        let stream = b"data: {\"x\": \"y\"}\n\ndata: two\n\n";
        let mut decoder = SseDecoder::new();
        let mut payloads = Vec::new();
        for byte in stream.iter() {
            payloads.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        payloads.extend(decoder.finish());
        assert_eq!(payloads, vec!["{\"x\": \"y\"}", "two"]);
    }

    #[test]
    fn test_multiline_data_joined_with_newline() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: first\ndata: second\n\n"]);
        assert_eq!(payloads, vec!["first\nsecond"]);
    }

    #[test]
    fn test_data_without_leading_space() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data:{\"a\":1}\n\n"]);
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_only_one_leading_space_stripped() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data:  padded\n\n"]);
        assert_eq!(payloads, vec![" padded"]);
    }

    #[test]
    fn test_comment_lines_ignored() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b": keep-alive\ndata: one\n: ping\n\n"]);
        assert_eq!(payloads, vec!["one"]);
    }

    #[test]
    fn test_other_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(
            &mut decoder,
            &[b"event: message\nid: 7\nretry: 100\ndata: one\n\n"],
        );
        assert_eq!(payloads, vec!["one"]);
    }

    #[test]
    fn test_blank_line_with_empty_buffer_is_noop() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"\n\n\ndata: one\n\n\n"]);
        assert_eq!(payloads, vec!["one"]);
    }

    #[test]
    fn test_whitespace_only_line_dispatches() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: one\n   \ndata: two\n\n"]);
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: one\r\n\r\ndata: two\r\n\r\n"]);
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn test_final_event_without_trailing_blank_line() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: one\n\ndata: last\n"]);
        assert_eq!(payloads, vec!["one", "last"]);
    }

    #[test]
    fn test_final_line_without_trailing_newline() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: one\n\ndata: last"]);
        assert_eq!(payloads, vec!["one", "last"]);
    }

    #[test]
    fn test_finish_dispatches_only_once() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data: last"), Vec::<String>::new());
        assert_eq!(decoder.finish(), vec!["last"]);
        assert_eq!(decoder.finish(), Vec::<String>::new());
    }

    #[test]
    fn test_empty_stream() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.finish(), Vec::<String>::new());
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        // "日本" is 6 bytes; split inside the second character
        let bytes = "data: 日本\n\n".as_bytes();
        let (head, tail) = bytes.split_at(10);
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[head, tail]);
        assert_eq!(payloads, vec!["日本"]);
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: a\xFFb\n\n"]);
        assert_eq!(payloads, vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn test_truncated_char_at_stream_end() {
        // First byte of a 3-byte character, then the stream ends
        let mut decoder = SseDecoder::new();
        let payloads = collect(&mut decoder, &[b"data: x\xE6"]);
        assert_eq!(payloads, vec!["x\u{FFFD}"]);
    }

    #[test]
    fn test_buffers_drain_after_dispatch() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: one\n\n");
        assert!(decoder.event_data.is_empty());
        assert!(decoder.line_buffer.is_empty());
        assert!(decoder.partial_utf8.is_empty());
    }

    #[tokio::test]
    async fn test_payload_stream_adapter() {
        let chunks: Vec<std::result::Result<&[u8], std::io::Error>> =
            vec![Ok(b"data: one\n\nda"), Ok(b"ta: two\n")];
        let stream = payload_stream(tokio_stream::iter(chunks));
        let payloads: Vec<_> = stream.collect::<Vec<_>>().await;
        let payloads: Vec<String> = payloads.into_iter().map(|p| p.unwrap()).collect();
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_payload_stream_surfaces_transport_error() {
        let chunks: Vec<std::result::Result<&[u8], std::io::Error>> = vec![
            Ok(b"data: one\n\n"),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )),
        ];
        let stream = payload_stream(tokio_stream::iter(chunks));
        let items: Vec<_> = stream.collect::<Vec<_>>().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "one");
        assert!(matches!(
            items[1],
            Err(MaresError::Api(ApiError::StreamError(_)))
        ));
    }
}
