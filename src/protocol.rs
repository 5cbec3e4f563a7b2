//! Newline-delimited JSON wire protocol.
//!
//! Each request and response is one JSON object on its own line. Requests are
//! tagged by `op`, responses by `status`:
//!
//! ```text
//! -> {"op":"set","key":"color","value":"blue"}
//! <- {"status":"ok"}
//! -> {"op":"get","key":"color"}
//! <- {"status":"value","value":"blue"}
//! -> {"op":"get_all"}
//! <- {"status":"snapshot","entries":{"color":"blue"}}
//! -> {"op":"subscribe"}
//! <- {"status":"subscribed"}
//! <- {"key":"color","value":"red"}
//! ```

use crate::error::{RegistryError, Result};
use crate::registry::KvRegistry;
use crate::types::Snapshot;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Read, Write};

/// Default limit for a single request line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// A client request.
///
/// Missing string fields decode as empty so validation can answer with the
/// same message for "absent" and "empty".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Set {
        #[serde(default)]
        key: String,
        #[serde(default)]
        value: String,
    },
    Get {
        #[serde(default)]
        key: String,
    },
    GetAll,
    Subscribe,
}

/// A server response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Value { value: String },
    NotFound,
    Snapshot { entries: Snapshot },
    Subscribed,
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

impl From<RegistryError> for Response {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Validation(message) | RegistryError::Protocol(message) => {
                Response::Error { message }
            }
            other => Response::error(other.to_string()),
        }
    }
}

impl Request {
    /// Reject requests the registry should never see.
    pub fn validate(&self) -> Result<()> {
        match self {
            Request::Set { key, value } if key.is_empty() || value.is_empty() => Err(
                RegistryError::Validation("missing key or value".to_string()),
            ),
            Request::Get { key } if key.is_empty() => {
                Err(RegistryError::Validation("missing key".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Parse one request line.
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| RegistryError::Protocol(format!("malformed request: {}", e)))
    }
}

/// Run a request against the registry.
///
/// `Subscribe` only acknowledges here; turning the connection into a
/// subscriber is the transport's job (see [`crate::connection`]).
pub fn handle_request(registry: &KvRegistry, request: Request) -> Response {
    if let Err(e) = request.validate() {
        return e.into();
    }

    match request {
        Request::Set { key, value } => {
            registry.set(key, value);
            Response::Ok
        }
        Request::Get { key } => match registry.get(&key) {
            Some(value) => Response::Value { value },
            None => Response::NotFound,
        },
        Request::GetAll => Response::Snapshot {
            entries: registry.get_all(),
        },
        Request::Subscribe => Response::Subscribed,
    }
}

/// Read one line of at most `max_bytes` (terminator excluded).
///
/// Returns `Ok(None)` on a clean end of stream. An oversized or non-UTF-8
/// line is consumed in full before the error is returned, so the caller can
/// keep reading the next line.
pub fn read_line<R: BufRead>(reader: &mut R, max_bytes: usize) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > max_bytes {
        skip_line(reader)?;
        return Err(RegistryError::Protocol(format!(
            "line exceeds {} bytes",
            max_bytes
        )));
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| RegistryError::Protocol("line is not valid UTF-8".to_string()))
}

/// Discard input up to and including the next newline.
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (found, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

/// Write a serializable value as one JSON line and flush.
pub fn write_json_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            Request::parse(r#"{"op":"set","key":"k","value":"v"}"#).unwrap(),
            Request::Set {
                key: "k".to_string(),
                value: "v".to_string()
            }
        );
        assert_eq!(
            Request::parse(r#" {"op":"get","key":"k"} "#).unwrap(),
            Request::Get {
                key: "k".to_string()
            }
        );
        assert_eq!(Request::parse(r#"{"op":"get_all"}"#).unwrap(), Request::GetAll);
        assert_eq!(
            Request::parse(r#"{"op":"subscribe"}"#).unwrap(),
            Request::Subscribe
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Request::parse("not json"),
            Err(RegistryError::Protocol(_))
        ));
        assert!(matches!(
            Request::parse(r#"{"op":"delete","key":"k"}"#),
            Err(RegistryError::Protocol(_))
        ));
    }

    #[test]
    fn test_missing_fields_fail_validation() {
        let request = Request::parse(r#"{"op":"set","key":"k"}"#).unwrap();
        assert!(matches!(request.validate(), Err(RegistryError::Validation(_))));

        let request = Request::parse(r#"{"op":"get"}"#).unwrap();
        assert!(matches!(request.validate(), Err(RegistryError::Validation(_))));
    }

    #[test]
    fn test_handle_set_and_get() {
        let registry = KvRegistry::new();

        let response = handle_request(
            &registry,
            Request::Set {
                key: "color".to_string(),
                value: "blue".to_string(),
            },
        );
        assert_eq!(response, Response::Ok);

        let response = handle_request(
            &registry,
            Request::Get {
                key: "color".to_string(),
            },
        );
        assert_eq!(
            response,
            Response::Value {
                value: "blue".to_string()
            }
        );

        let response = handle_request(
            &registry,
            Request::Get {
                key: "shape".to_string(),
            },
        );
        assert_eq!(response, Response::NotFound);
    }

    #[test]
    fn test_handle_rejects_empty_write() {
        let registry = KvRegistry::new();
        let handle = registry.subscribe();

        let response = handle_request(
            &registry,
            Request::Set {
                key: "k".to_string(),
                value: String::new(),
            },
        );

        assert_eq!(response, Response::error("missing key or value"));
        assert!(registry.get("k").is_none());
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_handle_get_all() {
        let registry = KvRegistry::new();
        registry.set("a", "1");
        registry.set("b", "2");

        let Response::Snapshot { entries } = handle_request(&registry, Request::GetAll) else {
            panic!("expected snapshot");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["a"], "1");
    }

    #[test]
    fn test_response_wire_shapes() {
        let encode = |r: &Response| serde_json::to_string(r).unwrap();

        assert_eq!(encode(&Response::Ok), r#"{"status":"ok"}"#);
        assert_eq!(encode(&Response::NotFound), r#"{"status":"not_found"}"#);
        assert_eq!(
            encode(&Response::Value {
                value: "v".to_string()
            }),
            r#"{"status":"value","value":"v"}"#
        );
        assert_eq!(
            encode(&Response::error("missing key")),
            r#"{"status":"error","message":"missing key"}"#
        );
    }

    #[test]
    fn test_read_line() {
        let mut reader = Cursor::new(b"first\r\nsecond\nlast".to_vec());

        assert_eq!(read_line(&mut reader, 64).unwrap().as_deref(), Some("first"));
        assert_eq!(read_line(&mut reader, 64).unwrap().as_deref(), Some("second"));
        assert_eq!(read_line(&mut reader, 64).unwrap().as_deref(), Some("last"));
        assert_eq!(read_line(&mut reader, 64).unwrap(), None);
    }

    #[test]
    fn test_read_line_limit() {
        let mut reader = Cursor::new(b"0123456789\nnext\n".to_vec());
        assert!(matches!(
            read_line(&mut reader, 4),
            Err(RegistryError::Protocol(_))
        ));
        assert_eq!(read_line(&mut reader, 4).unwrap().as_deref(), Some("next"));

        // Exactly at the limit is fine
        let mut reader = Cursor::new(b"0123\n".to_vec());
        assert_eq!(read_line(&mut reader, 4).unwrap().as_deref(), Some("0123"));
    }

    #[test]
    fn test_write_json_line() {
        let mut out = Vec::new();
        write_json_line(&mut out, &Response::Subscribed).unwrap();
        assert_eq!(out, b"{\"status\":\"subscribed\"}\n");
    }
}
