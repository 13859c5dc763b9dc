/*
 * lib.rs
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

//! Core for Raccolta: scan a POP3 or IMAP mailbox newest-first, filter
//! messages by date range and header fields, and save their attachments
//! into a configurable directory layout.
//!
//! The entry point is [`batch::BatchDownloader`]; everything else is the
//! plumbing it stands on (receivers, MIME decoding, date recovery, the
//! filter chain, and save strategies).

pub mod batch;
pub mod config;
pub mod date;
pub mod error;
pub mod filter;
pub mod message;
pub mod mime;
pub mod net;
pub mod receiver;
pub mod saver;

pub use batch::{BatchDownloader, LogReporter, Reporter, RunSummary};
pub use config::{DownloadConfig, FilterConfig, Protocol, ServerConfig};
pub use error::DownloadError;
pub use filter::FilterChain;
pub use message::MessageInfo;
pub use receiver::{MailReceiver, MailboxStatus, Receiver};
pub use saver::{AttachmentWriter, FsWriter, SaveStrategy};
