/*
 * imap.rs
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

//! IMAP receiver: LOGIN, STATUS, SELECT INBOX, SEARCH, FETCH, LOGOUT.
//! Tagged commands issued strictly one at a time; no pipelining.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::DownloadError;
use crate::net::MailStream;
use crate::receiver::{MailReceiver, MailboxStatus};

/// Completion status of a tagged response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImapStatus {
    Ok,
    No,
    Bad,
}

/// One parsed response line: untagged "* ..." or tagged "A001 OK ...".
#[derive(Debug)]
struct ImapLine {
    raw: String,
    tag: Option<String>,
    untagged: bool,
    status: Option<ImapStatus>,
}

fn parse_status(rest: &str) -> Option<ImapStatus> {
    if rest.starts_with("OK ") || rest == "OK" {
        Some(ImapStatus::Ok)
    } else if rest.starts_with("NO ") || rest == "NO" {
        Some(ImapStatus::No)
    } else if rest.starts_with("BAD ") || rest == "BAD" {
        Some(ImapStatus::Bad)
    } else {
        None
    }
}

fn parse_line(s: &str) -> ImapLine {
    let raw = s.to_string();
    let untagged = s.starts_with('*');
    let (tag, status) = if untagged {
        let rest = s.trim_start_matches('*').trim_start();
        (None, parse_status(rest))
    } else {
        let mut sp = s.splitn(2, ' ');
        let t = sp.next().unwrap_or("").to_string();
        let rest = sp.next().unwrap_or("");
        (Some(t), parse_status(rest))
    };
    ImapLine {
        raw,
        tag: tag.filter(|t| !t.is_empty()),
        untagged,
        status,
    }
}

/// Trailing {N} literal announcement on a response line.
fn literal_size(line: &str) -> Option<usize> {
    let open = line.rfind('{')?;
    let rest = &line[open + 1..];
    rest.strip_suffix('}')?.trim().parse().ok()
}

/// "* STATUS "INBOX" (MESSAGES 17)" -> 17.
fn parse_status_count(line: &str) -> Option<u32> {
    let open = line.find("MESSAGES ")?;
    let rest = &line[open + 9..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// "* SEARCH 1 2 3" -> sequence numbers in server order.
fn parse_search_ids(line: &str) -> Vec<String> {
    match line.strip_prefix("* SEARCH") {
        Some(rest) => rest.split_whitespace().map(|s| s.to_string()).collect(),
        None => Vec::new(),
    }
}

fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
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

/// Read one response line; when it announces a {N} literal, read the N
/// bytes too.
async fn read_imap_line<S>(
    stream: &mut S,
    buf: &mut Vec<u8>,
) -> io::Result<(String, Option<Vec<u8>>)>
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
    let line = String::from_utf8_lossy(&buf[..buf.len() - 2])
        .trim()
        .to_string();
    if let Some(n) = literal_size(&line) {
        let mut lit = vec![0u8; n];
        stream.read_exact(&mut lit).await?;
        return Ok((line, Some(lit)));
    }
    Ok((line, None))
}

/// Untagged line and its literal payload, when one was announced.
struct Untagged(String, Option<Vec<u8>>);

/// An authenticated IMAP session on the selected INBOX. Message
/// identifiers are the sequence numbers from SEARCH, valid for this
/// selection only.
pub struct ImapReceiver {
    stream: MailStream,
    read_buf: Vec<u8>,
    tag_counter: u32,
    closed: bool,
}

impl ImapReceiver {
    /// Connect, LOGIN, and SELECT INBOX.
    pub async fn connect(server: &ServerConfig) -> Result<ImapReceiver, DownloadError> {
        let stream = MailStream::connect(&server.host, server.port(), server.use_tls)
            .await
            .map_err(|e| {
                DownloadError::Connection(format!(
                    "connect to {}:{}: {}",
                    server.host,
                    server.port(),
                    e
                ))
            })?;
        let mut session = ImapReceiver {
            stream,
            read_buf: Vec::with_capacity(4096),
            tag_counter: 0,
            closed: false,
        };

        let (greeting, _) = read_imap_line(&mut session.stream, &mut session.read_buf).await?;
        if !greeting.starts_with("* OK") {
            return Err(DownloadError::Connection(format!(
                "unexpected greeting: {}",
                greeting
            )));
        }
        debug!(host = %server.host, "imap greeting received");

        let cmd = format!(
            "LOGIN {} {}",
            quote_string(&server.username),
            quote_string(&server.password)
        );
        let (_, done) = session.send_command(&cmd).await?;
        if done.status != Some(ImapStatus::Ok) {
            return Err(DownloadError::Auth(format!("LOGIN rejected: {}", done.raw)));
        }
        debug!(user = %server.username, "imap authenticated");

        let (_, done) = session.send_command("SELECT INBOX").await?;
        if done.status != Some(ImapStatus::Ok) {
            return Err(DownloadError::Fetch(format!(
                "SELECT INBOX failed: {}",
                done.raw
            )));
        }
        Ok(session)
    }

    fn next_tag(&mut self) -> String {
        self.tag_counter += 1;
        format!("A{:03}", self.tag_counter)
    }

    /// Send one tagged command and collect untagged lines until the
    /// matching tagged completion.
    async fn send_command(&mut self, command: &str) -> io::Result<(Vec<Untagged>, ImapLine)> {
        let tag = self.next_tag();
        write_line(&mut self.stream, &format!("{} {}", tag, command)).await?;

        let mut untagged = Vec::new();
        loop {
            let (line_str, literal) = read_imap_line(&mut self.stream, &mut self.read_buf).await?;
            let line = parse_line(&line_str);
            if line.tag.as_deref() == Some(tag.as_str()) {
                return Ok((untagged, line));
            }
            untagged.push(Untagged(line_str, literal));
        }
    }

    /// FETCH one item that carries a literal payload (header or full body).
    async fn fetch_literal(&mut self, command: &str) -> Result<Vec<u8>, DownloadError> {
        let (untagged, done) = self.send_command(command).await?;
        if done.status != Some(ImapStatus::Ok) {
            return Err(DownloadError::Fetch(format!(
                "{} failed: {}",
                command, done.raw
            )));
        }
        untagged
            .into_iter()
            .find(|u| u.0.contains(" FETCH ("))
            .and_then(|u| u.1)
            .ok_or_else(|| {
                DownloadError::Fetch(format!("{} returned no message data", command))
            })
    }
}

impl MailReceiver for ImapReceiver {
    /// STATUS INBOX (MESSAGES). IMAP has no cheap aggregate size; that
    /// field stays unknown.
    async fn mailbox_status(&mut self) -> Result<MailboxStatus, DownloadError> {
        let (untagged, done) = self.send_command("STATUS INBOX (MESSAGES)").await?;
        if done.status != Some(ImapStatus::Ok) {
            return Err(DownloadError::Fetch(format!(
                "STATUS failed: {}",
                done.raw
            )));
        }
        let count = untagged
            .iter()
            .find_map(|u| parse_status_count(&u.0))
            .unwrap_or(0);
        Ok(MailboxStatus {
            count,
            total_size: None,
        })
    }

    /// SEARCH ALL, reversed: sequence numbers ascend with arrival order.
    async fn list_identifiers(&mut self) -> Result<Vec<String>, DownloadError> {
        let (untagged, done) = self.send_command("SEARCH ALL").await?;
        if done.status != Some(ImapStatus::Ok) {
            return Err(DownloadError::Fetch(format!(
                "SEARCH failed: {}",
                done.raw
            )));
        }
        let mut ids = Vec::new();
        for u in &untagged {
            ids.extend(parse_search_ids(&u.0));
        }
        ids.reverse();
        Ok(ids)
    }

    /// BODY.PEEK keeps the \Seen flag untouched.
    async fn fetch_header(&mut self, id: &str) -> Result<Vec<u8>, DownloadError> {
        self.fetch_literal(&format!("FETCH {} (BODY.PEEK[HEADER])", id))
            .await
    }

    async fn fetch_full(&mut self, id: &str) -> Result<(Vec<u8>, u64), DownloadError> {
        let bytes = self
            .fetch_literal(&format!("FETCH {} (BODY.PEEK[])", id))
            .await?;
        let size = bytes.len() as u64;
        Ok((bytes, size))
    }

    /// LOGOUT, best effort. Safe to call more than once.
    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match self.send_command("LOGOUT").await {
            Ok(_) => debug!("imap session closed"),
            Err(e) => warn!("imap LOGOUT failed: {}", e),
        }
    }
}
