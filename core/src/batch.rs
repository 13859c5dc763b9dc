/*
 * batch.rs
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

//! The batch scan loop: walk the mailbox newest-first, peek headers, filter,
//! fetch matching messages in full, and hand their attachments to the writer.
//!
//! The loop stops early once a message predates the lower date bound, on the
//! assumption that mailbox order approximates chronological order. Fatal
//! errors (connection, auth) abort the run; per-message errors are counted
//! and the scan moves on.

use tracing::{info, warn};

use crate::config::DownloadConfig;
use crate::error::DownloadError;
use crate::filter::FilterChain;
use crate::message::{bytes_to_readable, MessageInfo};
use crate::mime::{extract_attachments, HeaderMap};
use crate::receiver::{MailReceiver, MailboxStatus, Receiver};
use crate::saver::{AttachmentWriter, SaveStrategy};

/// Progress observer for one run. All methods default to no-ops so callers
/// implement only what they display.
pub trait Reporter {
    fn mailbox_status(&mut self, _status: &MailboxStatus) {}

    /// A message matched and at least one attachment was written.
    /// `position` is 1-based within the scan, `saved` the attachment count.
    fn message_saved(&mut self, _position: usize, _total: usize, _info: &MessageInfo, _saved: usize) {
    }

    /// A message was examined but filtered out or carried no attachments.
    fn message_skipped(&mut self, _position: usize, _total: usize, _info: &MessageInfo) {}

    /// A message could not be fetched or parsed; the scan continues.
    fn message_error(&mut self, _id: &str, _error: &DownloadError) {}

    fn finished(&mut self, _summary: &RunSummary) {}
}

/// Reporter that writes run progress to the tracing subscriber.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn mailbox_status(&mut self, status: &MailboxStatus) {
        match status.total_size {
            Some(size) => info!(
                count = status.count,
                size = %bytes_to_readable(size),
                "mailbox status"
            ),
            None => info!(count = status.count, "mailbox status"),
        }
    }

    fn message_saved(&mut self, position: usize, total: usize, info: &MessageInfo, saved: usize) {
        info!(
            position,
            total,
            subject = %info.subject,
            from = %info.from_address,
            attachments = saved,
            "message saved"
        );
    }

    fn message_skipped(&mut self, position: usize, total: usize, info: &MessageInfo) {
        info!(position, total, subject = %info.subject, "message skipped");
    }

    fn message_error(&mut self, id: &str, error: &DownloadError) {
        warn!(id, %error, "message skipped after error");
    }

    fn finished(&mut self, summary: &RunSummary) {
        info!(
            examined = summary.examined,
            saved = summary.saved,
            skipped = summary.skipped,
            errors = summary.errors,
            attachments = summary.attachments_saved,
            stopped_early = summary.stopped_early,
            "run finished"
        );
    }
}

/// Outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages whose headers were parsed, including ones later skipped.
    pub examined: usize,
    /// Messages with at least one attachment written.
    pub saved: usize,
    /// Messages filtered out or without attachments.
    pub skipped: usize,
    /// Messages lost to fetch, parse, or write errors.
    pub errors: usize,
    /// Attachment files written in total.
    pub attachments_saved: usize,
    /// True when the scan hit a message older than the lower date bound.
    pub stopped_early: bool,
}

/// One configured download run over an open receiver.
pub struct BatchDownloader<R, W, P> {
    receiver: R,
    writer: W,
    reporter: P,
    filter: FilterChain,
    strategy: SaveStrategy,
    config: DownloadConfig,
}

impl<W, P> BatchDownloader<Receiver, W, P>
where
    W: AttachmentWriter,
    P: Reporter,
{
    /// Validate the configuration, then connect and authenticate.
    pub async fn connect(
        config: DownloadConfig,
        writer: W,
        reporter: P,
    ) -> Result<Self, DownloadError> {
        config.validate()?;
        let receiver = Receiver::connect(&config.server).await?;
        BatchDownloader::new(config, receiver, writer, reporter)
    }
}

impl<R, W, P> BatchDownloader<R, W, P>
where
    R: MailReceiver,
    W: AttachmentWriter,
    P: Reporter,
{
    /// Wrap an already connected receiver. Fails on invalid configuration.
    pub fn new(
        config: DownloadConfig,
        receiver: R,
        writer: W,
        reporter: P,
    ) -> Result<Self, DownloadError> {
        config.validate()?;
        let filter = FilterChain::from_config(&config.filter)?;
        let strategy = SaveStrategy::from_mode(config.save_mode)?;
        Ok(BatchDownloader {
            receiver,
            writer,
            reporter,
            filter,
            strategy,
            config,
        })
    }

    /// Run the scan to completion and close the session. The receiver is
    /// closed on every exit path, including fatal errors.
    pub async fn run(mut self) -> Result<RunSummary, DownloadError> {
        let status = match self.receiver.mailbox_status().await {
            Ok(s) => s,
            Err(e) => {
                self.receiver.close().await;
                return Err(e);
            }
        };
        self.reporter.mailbox_status(&status);

        let ids = match self.receiver.list_identifiers().await {
            Ok(ids) => ids,
            Err(e) => {
                self.receiver.close().await;
                return Err(e);
            }
        };

        let total = ids.len();
        let mut summary = RunSummary::default();

        for (index, id) in ids.iter().enumerate() {
            let position = index + 1;
            match self.process_message(position, total, id, &mut summary).await {
                Ok(true) => {}
                Ok(false) => {
                    summary.stopped_early = true;
                    break;
                }
                Err(e) if e.is_fatal() => {
                    self.receiver.close().await;
                    return Err(e);
                }
                Err(e) => {
                    summary.errors += 1;
                    self.reporter.message_error(id, &e);
                }
            }
        }

        self.receiver.close().await;
        self.reporter.finished(&summary);
        Ok(summary)
    }

    /// Handle one message. Ok(false) means the early-termination bound was
    /// crossed and the scan should stop.
    async fn process_message(
        &mut self,
        position: usize,
        total: usize,
        id: &str,
        summary: &mut RunSummary,
    ) -> Result<bool, DownloadError> {
        let header_bytes = self.receiver.fetch_header(id).await?;
        let headers = HeaderMap::parse(&header_bytes);
        let mut info = MessageInfo::from_headers(id, &headers)?;
        summary.examined += 1;

        if info.date < self.filter.lower_bound() {
            return Ok(false);
        }
        if !self.filter.matches(&info) {
            summary.skipped += 1;
            self.reporter.message_skipped(position, total, &info);
            return Ok(true);
        }

        let (raw, size) = self.receiver.fetch_full(id).await?;
        info.size = Some(size);

        let attachments = extract_attachments(&raw);
        if attachments.is_empty() {
            summary.skipped += 1;
            self.reporter.message_skipped(position, total, &info);
            return Ok(true);
        }

        let dir = self.strategy.resolve(&self.config.save_root, &info);
        let mut written = 0usize;
        for part in &attachments {
            match self.writer.save(&dir, &part.file_name, &part.data) {
                Ok(path) => {
                    info.add_attachment_name(part.file_name.clone());
                    written += 1;
                    tracing::debug!(path = %path.display(), "attachment written");
                }
                Err(e) => {
                    summary.errors += 1;
                    warn!(file = %part.file_name, %e, "attachment write failed");
                }
            }
        }

        if written > 0 {
            summary.saved += 1;
            summary.attachments_saved += written;
            self.reporter.message_saved(position, total, &info, written);
        } else {
            summary.skipped += 1;
            self.reporter.message_skipped(position, total, &info);
        }
        Ok(true)
    }
}
