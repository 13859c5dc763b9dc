/*
 * scan_loop.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration test for the batch scan loop against a scripted in-memory
 * receiver: reverse-chronological scan, early termination at the lower
 * date bound, per-message error recovery, and attachment placement.
 *
 * Run with:
 *   cargo test -p raccolta_core --test scan_loop -- --nocapture
 */

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use raccolta_core::batch::{BatchDownloader, Reporter, RunSummary};
use raccolta_core::config::{DownloadConfig, FilterConfig, Protocol, ServerConfig};
use raccolta_core::error::DownloadError;
use raccolta_core::receiver::{MailReceiver, MailboxStatus};
use raccolta_core::saver::FsWriter;

/// Scripted mailbox state shared between the test and the mock receiver.
#[derive(Default)]
struct MockState {
    /// (id, raw message), newest first.
    messages: Vec<(String, Vec<u8>)>,
    /// Fail mailbox_status with a fatal error.
    fail_status: bool,
    header_fetches: Vec<String>,
    full_fetches: Vec<String>,
    close_count: usize,
}

struct MockReceiver(Arc<Mutex<MockState>>);

impl MockReceiver {
    fn new(messages: Vec<(&str, Vec<u8>)>) -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState {
            messages: messages
                .into_iter()
                .map(|(id, raw)| (id.to_string(), raw))
                .collect(),
            ..MockState::default()
        }));
        (MockReceiver(state.clone()), state)
    }

    fn raw_for(&self, id: &str) -> Result<Vec<u8>, DownloadError> {
        self.0
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|(i, _)| i == id)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| DownloadError::Fetch(format!("no such message {}", id)))
    }
}

impl MailReceiver for MockReceiver {
    async fn mailbox_status(&mut self) -> Result<MailboxStatus, DownloadError> {
        let state = self.0.lock().unwrap();
        if state.fail_status {
            return Err(DownloadError::Connection("status failed".to_string()));
        }
        Ok(MailboxStatus {
            count: state.messages.len() as u32,
            total_size: Some(state.messages.iter().map(|(_, r)| r.len() as u64).sum()),
        })
    }

    async fn list_identifiers(&mut self) -> Result<Vec<String>, DownloadError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .messages
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn fetch_header(&mut self, id: &str) -> Result<Vec<u8>, DownloadError> {
        self.0.lock().unwrap().header_fetches.push(id.to_string());
        self.raw_for(id)
    }

    async fn fetch_full(&mut self, id: &str) -> Result<(Vec<u8>, u64), DownloadError> {
        self.0.lock().unwrap().full_fetches.push(id.to_string());
        let raw = self.raw_for(id)?;
        let size = raw.len() as u64;
        Ok((raw, size))
    }

    async fn close(&mut self) {
        self.0.lock().unwrap().close_count += 1;
    }
}

/// Reporter that records which callbacks fired.
#[derive(Default)]
struct RecordingReporter {
    saved: Vec<String>,
    skipped: Vec<String>,
    errored: Vec<String>,
    finished: Option<RunSummary>,
}

struct SharedReporter(Arc<Mutex<RecordingReporter>>);

impl Reporter for SharedReporter {
    fn message_saved(
        &mut self,
        _position: usize,
        _total: usize,
        info: &raccolta_core::MessageInfo,
        _saved: usize,
    ) {
        self.0.lock().unwrap().saved.push(info.id.clone());
    }

    fn message_skipped(&mut self, _position: usize, _total: usize, info: &raccolta_core::MessageInfo) {
        self.0.lock().unwrap().skipped.push(info.id.clone());
    }

    fn message_error(&mut self, id: &str, _error: &DownloadError) {
        self.0.lock().unwrap().errored.push(id.to_string());
    }

    fn finished(&mut self, summary: &RunSummary) {
        self.0.lock().unwrap().finished = Some(*summary);
    }
}

/// A multipart message with one text part and one base64 attachment.
fn message_with_attachment(date: &str, subject: &str, from: &str, file_name: &str) -> Vec<u8> {
    format!(
        "Date: {date}\r\n\
         Subject: {subject}\r\n\
         From: Sender <{from}>\r\n\
         To: class@example.com\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
         \r\n\
         --sep\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         see attachment\r\n\
         --sep\r\n\
         Content-Type: application/octet-stream; name=\"{file_name}\"\r\n\
         Content-Disposition: attachment; filename=\"{file_name}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         aGVsbG8=\r\n\
         --sep--\r\n"
    )
    .into_bytes()
}

fn message_without_attachment(date: &str, subject: &str) -> Vec<u8> {
    format!(
        "Date: {date}\r\n\
         Subject: {subject}\r\n\
         From: Sender <plain@example.com>\r\n\
         \r\n\
         just text\r\n"
    )
    .into_bytes()
}

fn config(save_root: PathBuf, save_mode: u8) -> DownloadConfig {
    DownloadConfig {
        server: ServerConfig::new(Protocol::Pop3, "pop.example.com", "user", "pass"),
        filter: FilterConfig {
            date_begin: "2020-1-1 00:00".to_string(),
            date_end: "2020-1-5 00:00".to_string(),
            time_zone: "+0800".to_string(),
            ..FilterConfig::default()
        },
        save_root,
        save_mode,
    }
}

fn run_downloader(
    messages: Vec<(&str, Vec<u8>)>,
    cfg: DownloadConfig,
) -> (
    Result<RunSummary, DownloadError>,
    Arc<Mutex<MockState>>,
    Arc<Mutex<RecordingReporter>>,
) {
    let (mock, state) = MockReceiver::new(messages);
    let reporter = Arc::new(Mutex::new(RecordingReporter::default()));
    let downloader =
        BatchDownloader::new(cfg, mock, FsWriter, SharedReporter(reporter.clone())).unwrap();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let result = rt.block_on(downloader.run());
    (result, state, reporter)
}

#[test]
fn scan_stops_at_lower_date_bound() {
    let dir = tempfile::tempdir().unwrap();
    // Newest first; the third message predates the range.
    let messages = vec![
        (
            "3",
            message_with_attachment("Sat, 4 Jan 2020 11:59:25 +0800", "third", "a@x.y", "a.txt"),
        ),
        (
            "2",
            message_with_attachment("Thu, 2 Jan 2020 09:00:00 +0800", "second", "b@x.y", "b.txt"),
        ),
        (
            "1",
            message_with_attachment("Mon, 30 Dec 2019 08:00:00 +0800", "old", "c@x.y", "c.txt"),
        ),
    ];
    let (result, state, _) = run_downloader(messages, config(dir.path().to_path_buf(), 0));
    let summary = result.unwrap();

    assert_eq!(summary.examined, 3);
    assert_eq!(summary.saved, 2);
    assert!(summary.stopped_early);
    assert_eq!(summary.errors, 0);

    let state = state.lock().unwrap();
    // The out-of-range message was never fetched in full.
    assert_eq!(state.full_fetches, vec!["3", "2"]);
    assert_eq!(state.header_fetches, vec!["3", "2", "1"]);
    assert_eq!(state.close_count, 1);
}

#[test]
fn unparsable_message_is_counted_and_scan_continues() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![
        (
            "3",
            message_with_attachment("Sat, 4 Jan 2020 11:59:25 +0800", "good", "a@x.y", "a.txt"),
        ),
        ("2", b"Subject: no date at all\r\n\r\nbody\r\n".to_vec()),
        (
            "1",
            message_with_attachment("Thu, 2 Jan 2020 09:00:00 +0800", "also good", "b@x.y", "b.txt"),
        ),
    ];
    let (result, state, reporter) = run_downloader(messages, config(dir.path().to_path_buf(), 0));
    let summary = result.unwrap();

    assert_eq!(summary.saved, 2);
    assert_eq!(summary.errors, 1);
    assert!(!summary.stopped_early);
    assert_eq!(reporter.lock().unwrap().errored, vec!["2"]);
    // The broken message never reached the full fetch.
    assert_eq!(state.lock().unwrap().full_fetches, vec!["3", "1"]);
}

#[test]
fn filtered_messages_are_skipped_without_full_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![
        (
            "2",
            message_with_attachment("Sat, 4 Jan 2020 11:59:25 +0800", "homework one", "a@x.y", "a.txt"),
        ),
        (
            "1",
            message_with_attachment("Thu, 2 Jan 2020 09:00:00 +0800", "unrelated", "b@x.y", "b.txt"),
        ),
    ];
    let mut cfg = config(dir.path().to_path_buf(), 0);
    cfg.filter.subject = "homework".to_string();
    let (result, state, reporter) = run_downloader(messages, cfg);
    let summary = result.unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(state.lock().unwrap().full_fetches, vec!["2"]);
    assert_eq!(reporter.lock().unwrap().skipped, vec!["1"]);
}

#[test]
fn matching_message_without_attachments_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![(
        "1",
        message_without_attachment("Sat, 4 Jan 2020 11:59:25 +0800", "text only"),
    )];
    let (result, _, _) = run_downloader(messages, config(dir.path().to_path_buf(), 0));
    let summary = result.unwrap();

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.saved, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attachments_saved, 0);
}

#[test]
fn attachments_land_in_strategy_directory() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![(
        "1",
        message_with_attachment("Sat, 4 Jan 2020 11:59:25 +0800", "week 1", "li@example.com", "hw.doc"),
    )];
    // Mode 1: one directory per sender address.
    let (result, _, _) = run_downloader(messages, config(dir.path().to_path_buf(), 1));
    let summary = result.unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.attachments_saved, 1);
    let written = dir.path().join("li@example.com").join("hw.doc");
    assert_eq!(std::fs::read(&written).unwrap(), b"hello");
}

#[test]
fn duplicate_names_get_suffixes_across_messages() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![
        (
            "2",
            message_with_attachment("Sat, 4 Jan 2020 11:59:25 +0800", "a", "x@y.z", "hw.doc"),
        ),
        (
            "1",
            message_with_attachment("Thu, 2 Jan 2020 09:00:00 +0800", "b", "x@y.z", "hw.doc"),
        ),
    ];
    let (result, _, _) = run_downloader(messages, config(dir.path().to_path_buf(), 0));
    let summary = result.unwrap();

    assert_eq!(summary.attachments_saved, 2);
    assert!(dir.path().join("hw.doc").exists());
    assert!(dir.path().join("hw_2.doc").exists());
}

#[test]
fn fatal_status_error_aborts_and_closes() {
    let dir = tempfile::tempdir().unwrap();
    let (mock, state) = MockReceiver::new(vec![]);
    state.lock().unwrap().fail_status = true;

    let reporter = Arc::new(Mutex::new(RecordingReporter::default()));
    let downloader = BatchDownloader::new(
        config(dir.path().to_path_buf(), 0),
        mock,
        FsWriter,
        SharedReporter(reporter.clone()),
    )
    .unwrap();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let result = rt.block_on(downloader.run());

    assert!(matches!(result, Err(DownloadError::Connection(_))));
    assert_eq!(state.lock().unwrap().close_count, 1);
    assert!(reporter.lock().unwrap().finished.is_none());
}

#[test]
fn invalid_configuration_is_rejected_before_running() {
    let (mock, _) = MockReceiver::new(vec![]);
    let reporter = Arc::new(Mutex::new(RecordingReporter::default()));
    let mut cfg = config(PathBuf::from("out"), 0);
    cfg.save_mode = 9;
    let result = BatchDownloader::new(cfg, mock, FsWriter, SharedReporter(reporter));
    assert!(matches!(result, Err(DownloadError::Config(_))));
}
