/*
 * message.rs
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

//! Parsed, decoded metadata for one message.

use chrono::{DateTime, Utc};

use crate::date::resolve_date;
use crate::error::DownloadError;
use crate::mime::{decode_header_value, parse_address_list, HeaderMap};

/// Placeholder for messages without a Subject header.
const NO_SUBJECT: &str = "(no subject)";

/// Decoded metadata for one message. Created fresh per scan iteration and
/// discarded afterwards; nothing is cached across messages.
#[derive(Debug, Clone)]
pub struct MessageInfo {
    /// Protocol-specific identifier, valid only for the current connection.
    pub id: String,
    /// Absolute UTC instant the message was sent (resolved, never defaulted).
    pub date: DateTime<Utc>,
    pub subject: String,
    pub from_address: String,
    pub from_name: String,
    pub to_addresses: Vec<String>,
    pub to_names: Vec<String>,
    /// Known only after the full fetch.
    pub size: Option<u64>,
    /// Populated during attachment extraction, in document order.
    pub attachment_names: Vec<String>,
}

impl MessageInfo {
    /// Build from a parsed header block. Fails only when the date cannot be
    /// resolved — such a message is unparsable, not silently defaulted.
    pub fn from_headers(id: impl Into<String>, headers: &HeaderMap) -> Result<Self, DownloadError> {
        let date = resolve_date(headers)?;

        let subject = match headers.get("Subject") {
            Some(raw) => decode_header_value(raw),
            None => NO_SUBJECT.to_string(),
        };

        let (from_name, from_address) = match headers.get("From") {
            Some(raw) => match parse_address_list(raw).into_iter().next() {
                Some(mb) => (
                    mb.display_name
                        .map(|n| decode_header_value(&n))
                        .unwrap_or_default(),
                    mb.address,
                ),
                None => (String::new(), String::new()),
            },
            None => (String::new(), String::new()),
        };

        let mut to_addresses = Vec::new();
        let mut to_names = Vec::new();
        for line in headers.get_all("To") {
            for mb in parse_address_list(line) {
                if let Some(name) = mb.display_name {
                    let decoded = decode_header_value(&name);
                    if !decoded.is_empty() {
                        to_names.push(decoded);
                    }
                }
                if !mb.address.is_empty() {
                    to_addresses.push(mb.address);
                }
            }
        }

        Ok(MessageInfo {
            id: id.into(),
            date,
            subject,
            from_address,
            from_name,
            to_addresses,
            to_names,
            size: None,
            attachment_names: Vec::new(),
        })
    }

    pub fn add_attachment_name(&mut self, name: impl Into<String>) {
        self.attachment_names.push(name.into());
    }
}

/// Human-readable size with two decimals, e.g. 12345678 -> "11.77 MB".
pub fn bytes_to_readable(size: u64) -> String {
    const UNITS: [&str; 6] = ["bytes", "KB", "MB", "GB", "TB", "PB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
