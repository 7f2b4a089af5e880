// crates/toolgate-mcp/src/framing.rs
// ============================================================================
// Module: Stdio Framing
// Description: Reads and writes JSON-RPC messages on byte streams.
// Purpose: Support Content-Length framed and newline-delimited clients.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Framing is detected per message. A message that starts with a
//! `Content-Length:` (or `Content-Type:`) header block is read as an MCP
//! framed body; anything else is one JSON document per line. Replies reuse the
//! framing of the request they answer.
//!
//! Security posture: bodies and header lines are size-bounded before they are
//! buffered. Oversized input is drained from the stream and reported as a
//! rejected frame so the loop can keep serving.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::rpc::INVALID_REQUEST;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a single header line.
const MAX_HEADER_LINE_BYTES: usize = 1024;
/// Maximum number of header lines per message.
const MAX_HEADER_LINES: usize = 16;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Wire framing of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` header block followed by the body.
    ContentLength,
    /// One JSON document terminated by a newline.
    Line,
}

/// Result of reading one message.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// Complete message body.
    Message {
        /// Framing the message arrived in.
        framing: Framing,
        /// Raw body bytes.
        body: Vec<u8>,
    },
    /// Message that was consumed but cannot be processed.
    Rejected {
        /// Framing the message arrived in.
        framing: Framing,
        /// JSON-RPC error code to report.
        code: i64,
        /// Error message to report.
        message: &'static str,
        /// Bytes consumed from the stream.
        consumed: usize,
    },
    /// Stream closed.
    Eof,
}

/// One bounded line read from the stream.
enum BoundedLine {
    /// Line contents without the trailing newline.
    Line {
        /// Line contents.
        line: Vec<u8>,
        /// Bytes consumed, including the terminator.
        read: usize,
    },
    /// Line exceeded the limit; the remainder was drained.
    TooLong(usize),
    /// Stream closed before any byte was read.
    Eof,
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Reads the next message from `reader`.
///
/// Blank lines between messages are skipped.
///
/// # Errors
///
/// Returns an I/O error when the underlying stream fails.
pub async fn read_frame<R>(reader: &mut R, max_body_bytes: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let line_limit = max_body_bytes.max(MAX_HEADER_LINE_BYTES);
    loop {
        let (line, read) = match read_bounded_line(reader, line_limit).await? {
            BoundedLine::Eof => return Ok(Frame::Eof),
            BoundedLine::TooLong(consumed) => return Ok(rejected_line(consumed)),
            BoundedLine::Line {
                line,
                read,
            } => (line, read),
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if is_header_line(&line) {
            return read_framed_body(reader, read, &line, max_body_bytes).await;
        }
        if line.len() > max_body_bytes {
            return Ok(rejected_line(read));
        }
        return Ok(Frame::Message {
            framing: Framing::Line,
            body: line,
        });
    }
}

/// Reads the rest of a header block and its body.
async fn read_framed_body<R>(
    reader: &mut R,
    header_bytes: usize,
    first_header: &[u8],
    max_body_bytes: usize,
) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = header_bytes;
    let mut content_length = parse_content_length(first_header);
    let mut header_lines = 1;
    loop {
        let line = match read_bounded_line(reader, MAX_HEADER_LINE_BYTES).await? {
            BoundedLine::Eof => return Ok(Frame::Eof),
            BoundedLine::TooLong(bytes) => {
                return Ok(rejected_header(consumed + bytes, "invalid header"));
            }
            BoundedLine::Line {
                line,
                read,
            } => {
                consumed += read;
                line
            }
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            break;
        }
        header_lines += 1;
        if header_lines > MAX_HEADER_LINES {
            return Ok(rejected_header(consumed, "invalid header"));
        }
        if let Some(length) = parse_content_length(&line) {
            content_length = Some(length);
        }
    }
    let Some(length) = content_length else {
        return Ok(rejected_header(consumed, "missing content length header"));
    };
    let Ok(length) = length else {
        return Ok(rejected_header(consumed, "invalid content length"));
    };
    if length > max_body_bytes {
        let drained = drain(reader, length).await?;
        return Ok(rejected_header(consumed + drained, "request too large"));
    }
    let mut body = vec![0u8; length];
    if let Err(err) = reader.read_exact(&mut body).await {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            return Ok(Frame::Eof);
        }
        return Err(err);
    }
    Ok(Frame::Message {
        framing: Framing::ContentLength,
        body,
    })
}

/// Builds a rejected frame for an oversized line.
const fn rejected_line(consumed: usize) -> Frame {
    Frame::Rejected {
        framing: Framing::Line,
        code: INVALID_REQUEST,
        message: "request too large",
        consumed,
    }
}

/// Builds a rejected frame for a header-framed message.
const fn rejected_header(consumed: usize, message: &'static str) -> Frame {
    Frame::Rejected {
        framing: Framing::ContentLength,
        code: INVALID_REQUEST,
        message,
        consumed,
    }
}

/// Returns true when the line opens a header block.
fn is_header_line(line: &[u8]) -> bool {
    has_prefix_ignore_case(line, b"content-length:")
        || has_prefix_ignore_case(line, b"content-type:")
}

/// Parses a `Content-Length` header line.
///
/// Returns `None` when the line is another header and `Some(Err(()))` when
/// the value is not a valid length.
fn parse_content_length(line: &[u8]) -> Option<Result<usize, ()>> {
    const PREFIX: &[u8] = b"content-length:";
    if !has_prefix_ignore_case(line, PREFIX) {
        return None;
    }
    let value = std::str::from_utf8(&line[PREFIX.len() ..]).map_err(|_| ());
    Some(value.and_then(|value| value.trim().parse::<usize>().map_err(|_| ())))
}

/// Case-insensitive ASCII prefix check.
fn has_prefix_ignore_case(line: &[u8], prefix: &[u8]) -> bool {
    line.len() >= prefix.len() && line[.. prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Reads one line of at most `limit` content bytes.
async fn read_bounded_line<R>(reader: &mut R, limit: usize) -> io::Result<BoundedLine>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(2);
    let read = (&mut *reader).take(cap).read_until(b'\n', &mut line).await?;
    if read == 0 {
        return Ok(BoundedLine::Eof);
    }
    let terminated = line.last() == Some(&b'\n');
    if !terminated && u64::try_from(read).unwrap_or(u64::MAX) >= cap {
        let drained = drain_line(reader).await?;
        return Ok(BoundedLine::TooLong(read + drained));
    }
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    if line.len() > limit {
        return Ok(BoundedLine::TooLong(read));
    }
    Ok(BoundedLine::Line {
        line,
        read,
    })
}

/// Discards bytes up to and including the next newline.
async fn drain_line<R>(reader: &mut R) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut drained = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(drained);
        }
        if let Some(position) = available.iter().position(|byte| *byte == b'\n') {
            reader.consume(position + 1);
            return Ok(drained + position + 1);
        }
        let len = available.len();
        reader.consume(len);
        drained += len;
    }
}

/// Discards exactly `length` bytes, or until end of stream.
async fn drain<R>(reader: &mut R, length: usize) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut remaining = length;
    while remaining > 0 {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        let step = available.len().min(remaining);
        reader.consume(step);
        remaining -= step;
    }
    Ok(length - remaining)
}

// ============================================================================
// SECTION: Writing
// ============================================================================

/// Writes one message using the given framing and flushes the stream.
///
/// # Errors
///
/// Returns an I/O error when the write fails.
pub async fn write_frame<W>(writer: &mut W, framing: Framing, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(payload).await?;
        }
        Framing::Line => {
            writer.write_all(payload).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await
}

// ============================================================================
// SECTION: Tests
// ============================================================================
