/*
 * pop3.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Raccolta, a batch mail attachment downloader.
 *
 * Raccolta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Raccolta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Raccolta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! POP3 receiver: USER/PASS, STAT, LIST, TOP, RETR, QUIT over a single
//! connected stream.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::DownloadError;
use crate::net::MailStream;
use crate::receiver::{MailReceiver, MailboxStatus};

/// Body lines requested alongside the headers in the TOP peek. A few
/// servers truncate TOP responses at the header/body boundary
/// inconsistently, so a small body margin keeps the header block intact.
const HEADER_PEEK_LINES: u32 = 40;

/// Read one CRLF-terminated line into `buf`, terminator included.
async fn read_raw_line<S>(stream: &mut S, buf: &mut Vec<u8>) -> io::Result<()>
where
    S: AsyncRead + Unpin,
{
    buf.clear();
    loop {
        let mut b = [0u8; 1];
        let n = stream.read(&mut b).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed",
            ));
        }
        buf.push(b[0]);
        if buf.len() >= 2 && buf[buf.len() - 2..] == *b"\r\n" {
            break;
        }
    }
    Ok(())
}

/// Read one status line as text. Only for single-line responses; message
/// content goes through [`read_multiline`] untouched.
async fn read_line<S>(stream: &mut S, buf: &mut Vec<u8>) -> io::Result<String>
where
    S: AsyncRead + Unpin,
{
    read_raw_line(stream, buf).await?;
    let line = String::from_utf8_lossy(&buf[..buf.len() - 2])
        .trim_end()
        .to_string();
    Ok(line)
}

async fn write_line<S>(stream: &mut S, line: &str) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await?;
    Ok(())
}

/// Read a multi-line response (lines until "." alone). POP3 dot-stuffing:
/// a leading "." in content arrives as "..". Message bytes pass through
/// exactly as received; charset decisions belong to the header parser and
/// transfer-encoding decoding, never to the transport.
async fn read_multiline<S>(stream: &mut S, buf: &mut Vec<u8>) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    loop {
        read_raw_line(stream, buf).await?;
        let line = &buf[..buf.len() - 2];
        if line == &b"."[..] {
            break;
        }
        let to_append = if line.starts_with(b"..") {
            &line[1..]
        } else {
            line
        };
        out.extend_from_slice(to_append);
        out.extend_from_slice(b"\r\n");
    }
    Ok(out)
}

fn check_ok(line: &str, context: &str) -> Result<(), DownloadError> {
    if line.starts_with("+OK") {
        Ok(())
    } else {
        Err(DownloadError::Fetch(format!("{}: {}", context, line)))
    }
}

/// Cut a TOP response down to its header block: everything before the
/// first empty line. A response with no empty line is taken whole, since
/// TOP may legitimately stop mid-headers on short messages.
fn isolate_header(peek: &[u8]) -> &[u8] {
    if peek.starts_with(b"\r\n") {
        return &peek[..0];
    }
    let mut i = 0;
    while i + 1 < peek.len() {
        if peek[i] == b'\r' && peek[i + 1] == b'\n' {
            let line_start = i + 2;
            if peek.get(line_start) == Some(&b'\r') && peek.get(line_start + 1) == Some(&b'\n') {
                return &peek[..line_start];
            }
        }
        i += 1;
    }
    peek
}

/// A connected, authenticated POP3 session. Message identifiers are the
/// session-local message numbers from LIST.
pub struct Pop3Receiver {
    stream: MailStream,
    read_buf: Vec<u8>,
    closed: bool,
}

impl Pop3Receiver {
    /// Connect, read the greeting, and authenticate with USER/PASS.
    pub async fn connect(server: &ServerConfig) -> Result<Pop3Receiver, DownloadError> {
        let mut stream = MailStream::connect(&server.host, server.port(), server.use_tls)
            .await
            .map_err(|e| {
                DownloadError::Connection(format!(
                    "connect to {}:{}: {}",
                    server.host,
                    server.port(),
                    e
                ))
            })?;
        let mut read_buf = Vec::with_capacity(4096);

        let greeting = read_line(&mut stream, &mut read_buf).await?;
        if !greeting.starts_with("+OK") {
            return Err(DownloadError::Connection(format!(
                "unexpected greeting: {}",
                greeting
            )));
        }
        debug!(host = %server.host, "pop3 greeting received");

        write_line(&mut stream, &format!("USER {}", server.username)).await?;
        let line = read_line(&mut stream, &mut read_buf).await?;
        if !line.starts_with("+OK") {
            return Err(DownloadError::Auth(format!("USER rejected: {}", line)));
        }
        write_line(&mut stream, &format!("PASS {}", server.password)).await?;
        let line = read_line(&mut stream, &mut read_buf).await?;
        if !line.starts_with("+OK") {
            return Err(DownloadError::Auth(format!("PASS rejected: {}", line)));
        }
        debug!(user = %server.username, "pop3 authenticated");

        Ok(Pop3Receiver {
            stream,
            read_buf,
            closed: false,
        })
    }
}

impl MailReceiver for Pop3Receiver {
    /// STAT -> message count and total mailbox size in octets.
    async fn mailbox_status(&mut self) -> Result<MailboxStatus, DownloadError> {
        write_line(&mut self.stream, "STAT").await?;
        let line = read_line(&mut self.stream, &mut self.read_buf).await?;
        check_ok(&line, "STAT")?;
        let rest = line.strip_prefix("+OK").map(|s| s.trim()).unwrap_or("");
        let mut parts = rest.split_whitespace();
        let count = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0u32);
        let total_size = parts.next().and_then(|s| s.parse().ok());
        Ok(MailboxStatus { count, total_size })
    }

    /// LIST, reversed: POP3 numbers messages oldest-first.
    async fn list_identifiers(&mut self) -> Result<Vec<String>, DownloadError> {
        write_line(&mut self.stream, "LIST").await?;
        let first = read_line(&mut self.stream, &mut self.read_buf).await?;
        check_ok(&first, "LIST")?;

        let mut ids = Vec::new();
        loop {
            let line = read_line(&mut self.stream, &mut self.read_buf).await?;
            if line == "." {
                break;
            }
            if let Some(msg_no) = line.split_whitespace().next() {
                if msg_no.chars().all(|c| c.is_ascii_digit()) && !msg_no.is_empty() {
                    ids.push(msg_no.to_string());
                }
            }
        }
        ids.reverse();
        Ok(ids)
    }

    /// TOP with a bounded body peek, cut down to the header block.
    async fn fetch_header(&mut self, id: &str) -> Result<Vec<u8>, DownloadError> {
        write_line(&mut self.stream, &format!("TOP {} {}", id, HEADER_PEEK_LINES)).await?;
        let line = read_line(&mut self.stream, &mut self.read_buf).await?;
        check_ok(&line, "TOP")?;
        let peek = read_multiline(&mut self.stream, &mut self.read_buf).await?;
        Ok(isolate_header(&peek).to_vec())
    }

    /// RETR -> full message. The reported size is the dot-unstuffed byte
    /// count actually received, not the LIST estimate.
    async fn fetch_full(&mut self, id: &str) -> Result<(Vec<u8>, u64), DownloadError> {
        write_line(&mut self.stream, &format!("RETR {}", id)).await?;
        let line = read_line(&mut self.stream, &mut self.read_buf).await?;
        check_ok(&line, "RETR")?;
        let bytes = read_multiline(&mut self.stream, &mut self.read_buf).await?;
        let size = bytes.len() as u64;
        Ok((bytes, size))
    }

    /// QUIT, best effort. Safe to call more than once.
    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = write_line(&mut self.stream, "QUIT").await {
            warn!("pop3 QUIT failed: {}", e);
            return;
        }
        let _ = read_line(&mut self.stream, &mut self.read_buf).await;
        debug!("pop3 session closed");
    }
}
