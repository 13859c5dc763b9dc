/*
 * config.rs
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

//! Run configuration: server endpoint, credentials, filter values, save mode.
//!
//! The configuration is consumed, not produced, by this crate; callers fill
//! the structs from whatever front-end they have. `DownloadConfig::validate`
//! rejects bad values before any network activity.

use std::path::PathBuf;

use crate::error::DownloadError;
use crate::filter::parse_boundary;
use crate::saver::SaveStrategy;

/// Mailbox retrieval protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Pop3,
    Imap,
}

impl Protocol {
    /// Parse from a free-form mode string ("POP3", "pop", "IMAP4", ...).
    pub fn parse(mode: &str) -> Result<Protocol, DownloadError> {
        let lower = mode.to_ascii_lowercase();
        if lower.contains("pop") {
            Ok(Protocol::Pop3)
        } else if lower.contains("imap") {
            Ok(Protocol::Imap)
        } else {
            Err(DownloadError::Config(format!(
                "unknown protocol {:?}, expected POP3 or IMAP",
                mode
            )))
        }
    }

    /// Default implicit-TLS port (POP3S 995, IMAPS 993).
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Pop3 => 995,
            Protocol::Imap => 993,
        }
    }
}

/// Server endpoint and credential pair.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub protocol: Protocol,
    pub host: String,
    /// None uses the protocol's implicit-TLS default.
    pub port: Option<u16>,
    pub use_tls: bool,
    pub username: String,
    pub password: String,
}

impl ServerConfig {
    pub fn new(
        protocol: Protocol,
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            host: host.into(),
            port: None,
            use_tls: true,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }
}

/// Filter values. Empty strings leave the corresponding predicate inactive.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Lower date boundary, "YYYY-MM-DD HH:MM".
    pub date_begin: String,
    /// Upper date boundary, "YYYY-MM-DD HH:MM".
    pub date_end: String,
    /// Zone offset applied to both boundaries, e.g. "+0800".
    pub time_zone: String,
    pub subject: String,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub to_name: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            date_begin: String::new(),
            date_end: String::new(),
            time_zone: "+0000".to_string(),
            subject: String::new(),
            from_address: String::new(),
            from_name: String::new(),
            to_address: String::new(),
            to_name: String::new(),
        }
    }
}

/// Complete configuration for one download run.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub server: ServerConfig,
    pub filter: FilterConfig,
    /// Root directory that the save strategy resolves against.
    pub save_root: PathBuf,
    /// Save mode 0..=5, see [`SaveStrategy::from_mode`].
    pub save_mode: u8,
}

impl DownloadConfig {
    /// Validate everything that can fail without touching the network.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.server.host.trim().is_empty() {
            return Err(DownloadError::Config("server host is empty".to_string()));
        }
        SaveStrategy::from_mode(self.save_mode)?;
        parse_boundary(&self.filter.date_begin, &self.filter.time_zone)?;
        parse_boundary(&self.filter.date_end, &self.filter.time_zone)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(save_mode: u8) -> DownloadConfig {
        DownloadConfig {
            server: ServerConfig::new(Protocol::Pop3, "pop.example.com", "a@example.com", "secret"),
            filter: FilterConfig {
                date_begin: "2020-1-1 00:00".to_string(),
                date_end: "2020-1-5 18:00".to_string(),
                time_zone: "+0800".to_string(),
                ..FilterConfig::default()
            },
            save_root: PathBuf::from("attachments"),
            save_mode,
        }
    }

    #[test]
    fn protocol_parse_is_lenient() {
        assert_eq!(Protocol::parse("POP3").unwrap(), Protocol::Pop3);
        assert_eq!(Protocol::parse("imap4-ssl").unwrap(), Protocol::Imap);
        assert!(Protocol::parse("nntp").is_err());
    }

    #[test]
    fn default_ports() {
        assert_eq!(config(0).server.port(), 995);
        let mut c = config(0);
        c.server.port = Some(7995);
        assert_eq!(c.server.port(), 7995);
    }

    #[test]
    fn validate_rejects_unknown_save_mode() {
        assert!(config(5).validate().is_ok());
        let err = config(6).validate().unwrap_err();
        assert!(matches!(err, DownloadError::Config(_)));
    }

    #[test]
    fn validate_rejects_bad_boundary() {
        let mut c = config(0);
        c.filter.date_begin = "not a date".to_string();
        assert!(matches!(c.validate(), Err(DownloadError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_host() {
        let mut c = config(0);
        c.server.host = "  ".to_string();
        assert!(matches!(c.validate(), Err(DownloadError::Config(_))));
    }
}
