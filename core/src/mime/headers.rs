/*
 * headers.rs
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

//! RFC 822 header block parsing: bytes to text, unfolding, ordered multi-value lookup.

use std::borrow::Cow;

/// Convert raw message bytes to text: UTF-8 when valid, otherwise GB18030
/// with replacement. Messages from legacy Chinese servers are frequently
/// GBK/GB2312 without any transfer-level indication; GB18030 is a superset
/// of both.
pub fn bytes_to_text(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            // No BOM sniffing: the fallback charset is fixed, not guessed.
            let (text, _) = encoding_rs::GB18030.decode_without_bom_handling(raw);
            Cow::Owned(text.into_owned())
        }
    }
}

/// Parsed header block: ordered (name, value) pairs with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    /// Parse a raw header block. Continuation lines (leading SP/HT) are
    /// unfolded into the previous value with a single space. Lines without
    /// a colon outside a fold are ignored (malformed input is tolerated,
    /// never fatal).
    pub fn parse(raw: &[u8]) -> HeaderMap {
        let text = bytes_to_text(raw);
        let mut entries: Vec<(String, String)> = Vec::new();
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                // Header/body boundary; callers normally pass only the header
                // block, but a trailing body must not leak into values.
                break;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(last) = entries.last_mut() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(line.trim_start());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                entries.push((name.trim().to_string(), value.trim_start().to_string()));
            }
        }
        HeaderMap { entries }
    }

    /// First value for `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` in order of appearance.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
