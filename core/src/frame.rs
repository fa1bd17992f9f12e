//! Wire framing (§4.1): a 4-byte big-endian length prefix followed by a
//! `Query` or `Response` body. Byte order is fixed to big-endian and
//! handler/error text is fixed to UTF-8, per the design notes' open
//! questions on byte order and string encoding.

use std::io::{self, Read, Write};

use bytes::Bytes;

use crate::error::FrameError;

/// Correlates a `Query` with its `Response` within one client's lifetime.
/// Strictly monotonically increasing and unique per `Client` (§3); signed
/// 32-bit, matching the wire layout.
pub type Dispatch = i32;

/// A request frame: `Message` (`dispatch` + opaque `message_data`) plus the
/// handler name it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub dispatch: Dispatch,
    pub handler: String,
    pub message_data: Bytes,
}

/// A reply frame: `Message` plus success flag and optional error text.
/// `error_msg` is `None` exactly when `ok` is `true` — an empty message is
/// not a distinct state on the wire (§4.1: "0 when no error").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub dispatch: Dispatch,
    pub ok: bool,
    pub error_msg: Option<String>,
    pub message_data: Bytes,
}

impl Response {
    pub fn ok(dispatch: Dispatch, message_data: Bytes) -> Self {
        Self {
            dispatch,
            ok: true,
            error_msg: None,
            message_data,
        }
    }

    pub fn failure(dispatch: Dispatch, error_msg: impl Into<String>) -> Self {
        Self {
            dispatch,
            ok: false,
            error_msg: Some(error_msg.into()),
            message_data: Bytes::new(),
        }
    }

    /// A synthesized timeout reply (§4.3): `ok=false`, `errorMsg="timeout"`.
    pub fn timeout(dispatch: Dispatch) -> Self {
        Self::failure(dispatch, "timeout")
    }
}

/// Encode a `Query`'s body (length prefix is applied separately by
/// [`write_frame`]).
pub fn encode_query(query: &Query) -> Vec<u8> {
    let handler = query.handler.as_bytes();
    let mut buf = Vec::with_capacity(8 + handler.len() + query.message_data.len());
    buf.extend_from_slice(&query.dispatch.to_be_bytes());
    buf.extend_from_slice(&(handler.len() as i32).to_be_bytes());
    buf.extend_from_slice(handler);
    buf.extend_from_slice(&query.message_data);
    buf
}

/// Decode a `Query` body previously produced by [`encode_query`].
pub fn decode_query(body: &[u8]) -> Result<Query, FrameError> {
    if body.len() < 8 {
        return Err(FrameError::Malformed("query header"));
    }
    let dispatch = read_i32(body, 0);
    let handler_len = read_i32(body, 4);
    if handler_len < 0 {
        return Err(FrameError::Malformed("handlerLen"));
    }
    let handler_len = handler_len as usize;
    let handler_end = 8usize
        .checked_add(handler_len)
        .ok_or(FrameError::Malformed("handlerLen"))?;
    if handler_end > body.len() {
        return Err(FrameError::Malformed("handlerLen"));
    }
    let handler = std::str::from_utf8(&body[8..handler_end])?.to_owned();
    let message_data = Bytes::copy_from_slice(&body[handler_end..]);
    Ok(Query {
        dispatch,
        handler,
        message_data,
    })
}

/// Encode a `Response`'s body (length prefix applied by [`write_frame`]).
pub fn encode_response(response: &Response) -> Vec<u8> {
    let error = response.error_msg.as_deref().unwrap_or("").as_bytes();
    let mut buf = Vec::with_capacity(9 + error.len() + response.message_data.len());
    buf.push(response.ok as u8);
    buf.extend_from_slice(&response.dispatch.to_be_bytes());
    buf.extend_from_slice(&(error.len() as i32).to_be_bytes());
    buf.extend_from_slice(error);
    buf.extend_from_slice(&response.message_data);
    buf
}

/// Decode a `Response` body previously produced by [`encode_response`].
pub fn decode_response(body: &[u8]) -> Result<Response, FrameError> {
    if body.len() < 9 {
        return Err(FrameError::Malformed("response header"));
    }
    let ok = body[0] != 0;
    let dispatch = read_i32(body, 1);
    let error_len = read_i32(body, 5);
    if error_len < 0 {
        return Err(FrameError::Malformed("errorLen"));
    }
    let error_len = error_len as usize;
    let error_end = 9usize
        .checked_add(error_len)
        .ok_or(FrameError::Malformed("errorLen"))?;
    if error_end > body.len() {
        return Err(FrameError::Malformed("errorLen"));
    }
    let error_msg = if error_len == 0 {
        None
    } else {
        Some(std::str::from_utf8(&body[9..error_end])?.to_owned())
    };
    let message_data = Bytes::copy_from_slice(&body[error_end..]);
    Ok(Response {
        dispatch,
        ok,
        error_msg,
        message_data,
    })
}

fn read_i32(body: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([body[at], body[at + 1], body[at + 2], body[at + 3]])
}

/// Write a length-prefixed frame: a 4-byte big-endian body length followed
/// by `body` itself.
pub fn write_frame<W: Write>(w: &mut W, body: &[u8]) -> io::Result<()> {
    w.write_all(&(body.len() as u32).to_be_bytes())?;
    w.write_all(body)?;
    w.flush()
}

/// Read one length-prefixed frame body from `r`. Returns
/// [`FrameError::ShortRead`] if the stream ends before the declared length
/// is satisfied (including while reading the length prefix itself).
pub fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_buf = [0u8; 4];
    read_exact_or_short(r, &mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    read_exact_or_short(r, &mut body)?;
    Ok(body)
}

fn read_exact_or_short<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::ShortRead),
        Err(e) => Err(FrameError::Io(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query_round_trip() {
        let query = Query {
            dispatch: 42,
            handler: "echo".to_owned(),
            message_data: Bytes::from_static(b"\x00\x00\x00\x07"),
        };
        let body = encode_query(&query);
        assert_eq!(decode_query(&body).unwrap(), query);
    }

    #[test]
    fn query_round_trip_empty_handler_and_payload() {
        let query = Query {
            dispatch: -1,
            handler: String::new(),
            message_data: Bytes::new(),
        };
        let body = encode_query(&query);
        assert_eq!(decode_query(&body).unwrap(), query);
    }

    #[test]
    fn response_round_trip_ok() {
        let response = Response::ok(7, Bytes::from_static(b"result"));
        let body = encode_response(&response);
        assert_eq!(decode_response(&body).unwrap(), response);
    }

    #[test]
    fn response_round_trip_failure() {
        let response = Response::failure(7, "nope: no such handler");
        let body = encode_response(&response);
        assert_eq!(decode_response(&body).unwrap(), response);
    }

    #[test]
    fn decode_query_rejects_oversized_handler_len() {
        let mut body = Vec::new();
        body.extend_from_slice(&1i32.to_be_bytes());
        body.extend_from_slice(&1000i32.to_be_bytes());
        assert!(matches!(decode_query(&body), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn decode_response_rejects_negative_error_len() {
        let mut body = vec![1u8];
        body.extend_from_slice(&1i32.to_be_bytes());
        body.extend_from_slice(&(-1i32).to_be_bytes());
        assert!(matches!(decode_response(&body), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn frame_round_trip_over_a_cursor() {
        let query = Query {
            dispatch: 99,
            handler: "nop".to_owned(),
            message_data: Bytes::from_static(b"abc"),
        };
        let body = encode_query(&query);

        let mut buf = Vec::new();
        write_frame(&mut buf, &body).unwrap();

        let mut cursor = io::Cursor::new(buf);
        let read_body = read_frame(&mut cursor).unwrap();
        assert_eq!(decode_query(&read_body).unwrap(), query);
    }

    #[test]
    fn short_read_on_truncated_frame() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"abc"); // fewer than the declared 10 bytes

        let mut cursor = io::Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor), Err(FrameError::ShortRead)));
    }
}
