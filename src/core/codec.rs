//! Line framing codec
//!
//! Converts the raw byte stream of a connection into discrete protocol
//! records and back. The wire unit is one JSON object per `\n`-terminated
//! line. Decoding is incremental over a growable buffer; blank lines and
//! records that are not valid JSON are discarded silently and decoding
//! continues (best-effort policy, not a protocol violation). A well-formed
//! record whose action is unrecognized decodes to `ClientRequest::Unknown`
//! so the dispatcher can answer it.

use bytes::BytesMut;
use log::debug;

use crate::core::message::{ClientRequest, ServerMessage};
use crate::error::{Result, RustyRelayError};

/// Incremental decoder for newline-delimited JSON records
pub struct LineCodec {
    buf: BytesMut,
}

impl LineCodec {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Accumulation buffer for the transport to read into
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Pop the next decodable request out of the buffer, skipping blank and
    /// malformed lines. Returns `None` once no complete line remains.
    pub fn next_request(&mut self) -> Option<ClientRequest> {
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);

            let text = match std::str::from_utf8(&line[..pos]) {
                Ok(text) => text.trim(),
                Err(_) => {
                    debug!("Discarding non-UTF-8 record");
                    continue;
                }
            };

            if text.is_empty() {
                continue;
            }

            match parse_request(text) {
                Some(request) => return Some(request),
                None => {
                    debug!("Discarding malformed record");
                    continue;
                }
            }
        }

        None
    }

    /// Serialize a record and append exactly one line terminator
    pub fn encode(message: &ServerMessage) -> Result<String> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| RustyRelayError::MessageParseError(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one record. `None` means the line was not valid JSON; any valid
/// JSON value yields a request, falling back to `Unknown` when the action
/// tag is missing or unrecognized.
fn parse_request(text: &str) -> Option<ClientRequest> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    Some(serde_json::from_value(value).unwrap_or(ClientRequest::Unknown))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(codec: &mut LineCodec, bytes: &[u8]) {
        codec.buffer_mut().extend_from_slice(bytes);
    }

    #[test]
    fn test_decode_single_record() {
        let mut codec = LineCodec::new();
        push(&mut codec, b"{\"action\":\"get_online_users\"}\n");

        assert!(matches!(
            codec.next_request(),
            Some(ClientRequest::GetOnlineUsers)
        ));
        assert!(codec.next_request().is_none());
    }

    #[test]
    fn test_decode_across_chunk_boundaries() {
        let mut codec = LineCodec::new();
        push(&mut codec, b"{\"action\":\"login\",\"identi");
        assert!(codec.next_request().is_none());

        push(&mut codec, b"fier\":\"alice\",\"password\":\"pw1\"}\n");
        match codec.next_request() {
            Some(ClientRequest::Login { identifier, .. }) => assert_eq!(identifier, "alice"),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_multiple_records_in_one_chunk() {
        let mut codec = LineCodec::new();
        push(
            &mut codec,
            b"{\"action\":\"view_users\"}\n{\"action\":\"get_online_users\"}\n",
        );

        assert!(matches!(codec.next_request(), Some(ClientRequest::ViewUsers)));
        assert!(matches!(
            codec.next_request(),
            Some(ClientRequest::GetOnlineUsers)
        ));
        assert!(codec.next_request().is_none());
    }

    #[test]
    fn test_malformed_and_blank_lines_skipped() {
        let mut codec = LineCodec::new();
        push(
            &mut codec,
            b"this is not json\n\n   \n{\"action\":\"view_users\"}\n",
        );

        assert!(matches!(codec.next_request(), Some(ClientRequest::ViewUsers)));
        assert!(codec.next_request().is_none());
    }

    #[test]
    fn test_unknown_action_is_a_request_not_a_decode_failure() {
        let mut codec = LineCodec::new();
        push(&mut codec, b"{\"action\":\"dance\"}\n");

        assert!(matches!(codec.next_request(), Some(ClientRequest::Unknown)));
    }

    #[test]
    fn test_valid_json_without_action_becomes_unknown() {
        let mut codec = LineCodec::new();
        push(&mut codec, b"{\"hello\":\"world\"}\n");

        assert!(matches!(codec.next_request(), Some(ClientRequest::Unknown)));
    }

    #[test]
    fn test_encode_appends_exactly_one_terminator() {
        let line = LineCodec::encode(&ServerMessage::success("Delivered")).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_carriage_return_trimmed() {
        let mut codec = LineCodec::new();
        push(&mut codec, b"{\"action\":\"view_users\"}\r\n");

        assert!(matches!(codec.next_request(), Some(ClientRequest::ViewUsers)));
    }
}
