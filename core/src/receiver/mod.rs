/*
 * mod.rs
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

//! Receiver abstraction over the two mailbox protocols.
//!
//! A receiver owns exactly one live connection; identifiers from
//! `list_identifiers` are valid only for the lifetime of that connection.
//! Connection and authentication failures are terminal for the run;
//! per-message fetch failures are recovered by the scan loop.

mod imap;
mod pop3;

pub use imap::ImapReceiver;
pub use pop3::Pop3Receiver;

use crate::config::{Protocol, ServerConfig};
use crate::error::DownloadError;

/// Mailbox status for reporting. `total_size` is None for protocols that
/// cannot report it cheaply (IMAP).
#[derive(Debug, Clone, Copy)]
pub struct MailboxStatus {
    pub count: u32,
    pub total_size: Option<u64>,
}

/// Capability contract shared by both protocol variants.
///
/// `list_identifiers` returns newest first: the scan relies on mailbox
/// insertion order approximating send date. `fetch_full` is the expensive
/// path, issued only after the filter matched header-derived metadata.
#[allow(async_fn_in_trait)]
pub trait MailReceiver {
    async fn mailbox_status(&mut self) -> Result<MailboxStatus, DownloadError>;

    /// Message identifiers, newest first.
    async fn list_identifiers(&mut self) -> Result<Vec<String>, DownloadError>;

    /// Header block only (bounded peek for POP3, explicit header fetch for IMAP).
    async fn fetch_header(&mut self, id: &str) -> Result<Vec<u8>, DownloadError>;

    /// Full raw message plus its size in bytes.
    async fn fetch_full(&mut self, id: &str) -> Result<(Vec<u8>, u64), DownloadError>;

    /// Idempotent, best-effort teardown. Never errors.
    async fn close(&mut self);
}

/// Dispatch over the two protocol variants. Callers never inspect which
/// variant they hold.
pub enum Receiver {
    Pop3(Pop3Receiver),
    Imap(ImapReceiver),
}

impl Receiver {
    /// Establish and authenticate a session per the server configuration.
    /// Fails fast; a partially opened socket is released before returning.
    pub async fn connect(server: &ServerConfig) -> Result<Receiver, DownloadError> {
        match server.protocol {
            Protocol::Pop3 => Ok(Receiver::Pop3(Pop3Receiver::connect(server).await?)),
            Protocol::Imap => Ok(Receiver::Imap(ImapReceiver::connect(server).await?)),
        }
    }
}

impl MailReceiver for Receiver {
    async fn mailbox_status(&mut self) -> Result<MailboxStatus, DownloadError> {
        match self {
            Receiver::Pop3(r) => r.mailbox_status().await,
            Receiver::Imap(r) => r.mailbox_status().await,
        }
    }

    async fn list_identifiers(&mut self) -> Result<Vec<String>, DownloadError> {
        match self {
            Receiver::Pop3(r) => r.list_identifiers().await,
            Receiver::Imap(r) => r.list_identifiers().await,
        }
    }

    async fn fetch_header(&mut self, id: &str) -> Result<Vec<u8>, DownloadError> {
        match self {
            Receiver::Pop3(r) => r.fetch_header(id).await,
            Receiver::Imap(r) => r.fetch_header(id).await,
        }
    }

    async fn fetch_full(&mut self, id: &str) -> Result<(Vec<u8>, u64), DownloadError> {
        match self {
            Receiver::Pop3(r) => r.fetch_full(id).await,
            Receiver::Imap(r) => r.fetch_full(id).await,
        }
    }

    async fn close(&mut self) {
        match self {
            Receiver::Pop3(r) => r.close().await,
            Receiver::Imap(r) => r.close().await,
        }
    }
}
