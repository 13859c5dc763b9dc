/*
 * error.rs
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

//! Download errors: connection/auth/config are fatal, fetch/parse are recovered per message.

use std::fmt;
use std::io;

/// Errors from receivers, parsing, and the download loop.
#[derive(Debug)]
pub enum DownloadError {
    /// Host unreachable, TLS failure, connection lost. Fatal for the run.
    Connection(String),
    /// Bad credentials or protocol disabled on the server. Fatal for the run.
    Auth(String),
    /// A single message could not be retrieved (stale identifier, transient I/O). Recovered.
    Fetch(String),
    /// A single message could not be parsed (undecodable structure, unresolvable date). Recovered.
    Parse(String),
    /// Invalid configuration (unknown save mode, bad date boundary). Fatal before any network activity.
    Config(String),
}

impl DownloadError {
    /// True when the error terminates the whole run; false when the scan skips the message and continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::Connection(_) | DownloadError::Auth(_) | DownloadError::Config(_)
        )
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Connection(m) => write!(f, "connection error: {}", m),
            DownloadError::Auth(m) => write!(f, "authentication error: {}", m),
            DownloadError::Fetch(m) => write!(f, "fetch error: {}", m),
            DownloadError::Parse(m) => write!(f, "parse error: {}", m),
            DownloadError::Config(m) => write!(f, "configuration error: {}", m),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<io::Error> for DownloadError {
    fn from(e: io::Error) -> Self {
        DownloadError::Connection(e.to_string())
    }
}
