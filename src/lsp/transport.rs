//! `Content-Length` framing for JSON-RPC over stdio.

use std::io::{BufRead, Read, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SigcovError};

pub fn write_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let body = serde_json::to_string(message)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed message. `Ok(None)` on a clean end of stream.
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<Value>> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut saw_header = false;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            if saw_header {
                return Err(SigcovError::Protocol("stream ended inside headers".to_string()));
            }
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;
        if let Some((name, value)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let len = value.trim().parse().map_err(|_| {
                    SigcovError::Protocol(format!("invalid Content-Length '{}'", value.trim()))
                })?;
                content_length = Some(len);
            }
        }
    }

    let len = content_length
        .ok_or_else(|| SigcovError::Protocol("missing Content-Length header".to_string()))?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_write_frames_body() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({"id": 1})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Content-Length: 8\r\n\r\n{\"id\":1}");
    }

    #[test]
    fn test_read_back_to_back_messages() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({"id": 1, "result": "a"})).unwrap();
        write_message(&mut buf, &json!({"method": "window/logMessage"})).unwrap();
        let mut reader = Cursor::new(buf);

        assert_eq!(read_message(&mut reader).unwrap().unwrap()["result"], "a");
        assert_eq!(read_message(&mut reader).unwrap().unwrap()["method"], "window/logMessage");
        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_read_extra_headers_and_case() {
        let body = r#"{"id":2}"#;
        let raw = format!(
            "content-length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}",
            body.len(),
            body
        );
        let msg = read_message(&mut Cursor::new(raw)).unwrap().unwrap();
        assert_eq!(msg["id"], 2);
    }

    #[test]
    fn test_read_multibyte_body_uses_byte_length() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({"contents": "héllo → wörld"})).unwrap();
        let msg = read_message(&mut Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(msg["contents"], "héllo → wörld");
    }

    #[test]
    fn test_missing_length_is_protocol_error() {
        let err = read_message(&mut Cursor::new("X-Foo: 1\r\n\r\n{}")).unwrap_err();
        assert!(matches!(err, SigcovError::Protocol(_)));
    }

    #[test]
    fn test_truncated_body_is_io_error() {
        let err = read_message(&mut Cursor::new("Content-Length: 50\r\n\r\n{}")).unwrap_err();
        assert!(matches!(err, SigcovError::Io(_)));
    }
}
