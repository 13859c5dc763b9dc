/*
 * address.rs
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

//! Address list parsing for From/To header values (RFC 5322 mailbox-list,
//! tolerant subset). Display names may be quoted strings, bare phrases, or
//! RFC 2047 encoded-words; the encoded-word decode happens in the caller.

/// One parsed mailbox: optional raw display name plus addr-spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub display_name: Option<String>,
    pub address: String,
}

/// Parse a comma-separated mailbox list. Entries that yield neither a
/// display name nor an address are dropped; the function never fails.
pub fn parse_address_list(value: &str) -> Vec<Mailbox> {
    split_list(value)
        .into_iter()
        .filter_map(|entry| parse_one(&entry))
        .collect()
}

/// Parse a single mailbox ("Display" <a@b.c>, Display <a@b.c>, or a@b.c).
pub fn parse_one(entry: &str) -> Option<Mailbox> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    if let Some(open) = entry.find('<') {
        let close = entry[open + 1..].find('>')? + open + 1;
        let address = entry[open + 1..close].trim().to_string();
        let name = entry[..open].trim().trim_matches('"').trim();
        let display_name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
        if address.is_empty() {
            return None;
        }
        return Some(Mailbox { display_name, address });
    }
    if entry.contains('@') {
        return Some(Mailbox {
            display_name: None,
            address: entry.trim_matches('"').to_string(),
        });
    }
    None
}

/// Split on commas that are outside double quotes and outside angle brackets.
fn split_list(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    for c in value.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '<' if !in_quotes => {
                in_angle = true;
                current.push(c);
            }
            '>' if !in_quotes => {
                in_angle = false;
                current.push(c);
            }
            ',' if !in_quotes && !in_angle => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}
