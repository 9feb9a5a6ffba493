use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest body accepted under `Content-Length` framing.
pub const MAX_FRAME_BYTES: u64 = 16 * 1024 * 1024;

/// How a message arrived on the wire. Replies use the same framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON document per line.
    Newline,
    /// LSP-style `Content-Length` header block followed by the body.
    ContentLength,
}

/// One message read from the transport. `payload` is `Err` with a parse
/// message when the body was not valid JSON; the stream is still usable.
#[derive(Debug)]
pub struct Frame {
    pub payload: Result<Value, String>,
    pub framing: Framing,
}

/// Read the next message, detecting the framing from its first line.
/// Returns `Ok(None)` at a clean end of input.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<u64> = None;
    let mut in_headers = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !in_headers {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let trimmed = line.trim();
        if !in_headers {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                return Ok(Some(Frame {
                    payload: parse(trimmed.as_bytes()),
                    framing: Framing::Newline,
                }));
            }
            if !is_header_line(trimmed) {
                let shown: String = trimmed.chars().take(40).collect();
                return Ok(Some(Frame {
                    payload: Err(format!("Invalid JSON payload: unexpected text '{shown}'")),
                    framing: Framing::Newline,
                }));
            }
            in_headers = true;
        } else if trimmed.is_empty() {
            break;
        }

        if let Some((name, value)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let parsed = value.trim().parse::<u64>().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "Invalid Content-Length header")
                })?;
                content_length = Some(parsed);
            }
        }
    }

    let content_length = content_length.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "Missing Content-Length header")
    })?;
    if content_length > MAX_FRAME_BYTES {
        // Skip the body without buffering it so the next frame starts clean.
        let mut body = (&mut *reader).take(content_length);
        let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
        tracing::warn!(content_length, skipped, "MCP message too large, discarded");
        return Ok(Some(Frame {
            payload: Err(format!(
                "Message body of {content_length} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
            )),
            framing: Framing::ContentLength,
        }));
    }

    let mut body = vec![0_u8; content_length as usize];
    reader.read_exact(&mut body).await?;

    Ok(Some(Frame {
        payload: parse(&body),
        framing: Framing::ContentLength,
    }))
}

/// `Name-Like: value`, the only kind of line that starts a header block.
fn is_header_line(line: &str) -> bool {
    line.split_once(':').is_some_and(|(name, _)| {
        !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'-')
    })
}

fn parse(bytes: &[u8]) -> Result<Value, String> {
    serde_json::from_slice(bytes).map_err(|e| format!("Invalid JSON payload: {e}"))
}

pub async fn write_frame<W>(writer: &mut W, value: &Value, framing: Framing) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Newline => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
