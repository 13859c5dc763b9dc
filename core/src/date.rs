/*
 * date.rs
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

//! Recover a usable timestamp from inconsistent mail headers.
//!
//! Priority: the Date header; then a 10-digit epoch embedded in the
//! vendor tracking header X-QQ-mid; then the timestamp suffix of the
//! last hop in the Received chain. No source at all is a hard error for
//! the message, never a default-to-now.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::DownloadError;
use crate::mime::HeaderMap;

/// Canonical layout after normalization, e.g. "4 Jan 2020 11:59:25 +0800".
const DATE_LAYOUT: &str = "%d %b %Y %H:%M:%S %z";

/// Marker character delimiting the epoch value inside X-QQ-mid
/// (e.g. "newapiserver5t1618419145t10192").
const VENDOR_MARKER: u8 = b't';

/// Resolve the message timestamp as an absolute UTC instant.
pub fn resolve_date(headers: &HeaderMap) -> Result<DateTime<Utc>, DownloadError> {
    if let Some(value) = headers.get("Date") {
        if let Some(ts) = parse_normalized(value) {
            return Ok(ts);
        }
    }
    if let Some(ts) = date_from_vendor_header(headers) {
        return Ok(ts);
    }
    if let Some(ts) = date_from_received(headers) {
        return Ok(ts);
    }
    Err(DownloadError::Parse(
        "no usable date in message headers".to_string(),
    ))
}

/// Normalize then parse a Date-style value.
///
/// Normalization drops the leading weekday (everything before the first
/// digit), maps a literal "GMT" zone marker to "+0000", and cuts the value
/// 12 bytes past the first colon: the canonical tail is `HH:MM:SS +ZZZZ`,
/// and some servers append free-form commentary after it.
fn parse_normalized(value: &str) -> Option<DateTime<Utc>> {
    let value = value.replace("GMT", "+0000");
    let start = value.as_bytes().iter().position(|b| b.is_ascii_digit())?;
    let colon = value.find(':')?;
    if colon < start {
        return None;
    }
    let end = (colon + 12).min(value.len());
    let cut = value.get(start..end)?;
    DateTime::parse_from_str(cut, DATE_LAYOUT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Timestamp embedded in X-QQ-mid: a 10-digit epoch delimited by the
/// marker character on both sides.
fn date_from_vendor_header(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get("X-QQ-mid")?;
    let bytes = value.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != VENDOR_MARKER {
            continue;
        }
        let digits = bytes.get(i + 1..i + 11)?;
        if digits.iter().all(|b| b.is_ascii_digit()) && bytes.get(i + 11) == Some(&VENDOR_MARKER) {
            let epoch: i64 = std::str::from_utf8(digits).ok()?.parse().ok()?;
            return Utc.timestamp_opt(epoch, 0).single();
        }
    }
    None
}

/// Timestamp suffix of the last hop in the Received chain: the substring
/// after the final semicolon of the first (most recent) Received header.
fn date_from_received(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get("Received")?;
    let suffix = &value[value.rfind(';')? + 1..];
    parse_normalized(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(lines: &[&str]) -> HeaderMap {
        let raw = lines.join("\r\n") + "\r\n";
        HeaderMap::parse(raw.as_bytes())
    }

    #[test]
    fn standard_date_with_weekday() {
        let h = headers(&["Date: Sat, 4 Jan 2020 11:59:25 +0800"]);
        let ts = resolve_date(&h).unwrap();
        assert_eq!(ts.timestamp(), 1578110365);
    }

    #[test]
    fn date_without_weekday() {
        let h = headers(&["Date: 4 Jul 2019 21:37:08 +0800"]);
        assert!(resolve_date(&h).is_ok());
    }

    #[test]
    fn gmt_zone_marker() {
        let a = resolve_date(&headers(&["Date: 4 Jan 2020 03:59:25 GMT"])).unwrap();
        let b = resolve_date(&headers(&["Date: 4 Jan 2020 11:59:25 +0800"])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_commentary_is_cut() {
        let h = headers(&["Date: Sat, 4 Jan 2020 11:59:25 +0800 (CST)"]);
        let ts = resolve_date(&h).unwrap();
        assert_eq!(ts.timestamp(), 1578110365);
    }

    #[test]
    fn vendor_header_fallback() {
        let h = headers(&["X-QQ-mid: newapiserver5t1618419145t10192"]);
        let ts = resolve_date(&h).unwrap();
        assert_eq!(ts.timestamp(), 1618419145);
    }

    #[test]
    fn received_fallback() {
        let h = headers(&[
            "Received: from mx.example.com (mx [10.0.0.1]) by in.example.net; Sat, 4 Jan 2020 11:59:25 +0800",
        ]);
        let ts = resolve_date(&h).unwrap();
        assert_eq!(ts.timestamp(), 1578110365);
    }

    #[test]
    fn date_header_wins_over_fallbacks() {
        let h = headers(&[
            "Date: 4 Jan 2020 11:59:25 +0800",
            "X-QQ-mid: t1618419145t",
        ]);
        assert_eq!(resolve_date(&h).unwrap().timestamp(), 1578110365);
    }

    #[test]
    fn vendor_beats_received() {
        let h = headers(&[
            "X-QQ-mid: api5t1618419145t1",
            "Received: by x; 4 Jan 2020 11:59:25 +0800",
        ]);
        assert_eq!(resolve_date(&h).unwrap().timestamp(), 1618419145);
    }

    #[test]
    fn no_source_is_an_error() {
        let h = headers(&["Subject: dateless"]);
        let err = resolve_date(&h).unwrap_err();
        assert!(matches!(err, DownloadError::Parse(_)));
    }

    #[test]
    fn malformed_vendor_value_ignored() {
        let h = headers(&["X-QQ-mid: t123t", "Date: 4 Jan 2020 11:59:25 +0800"]);
        assert!(resolve_date(&h).is_ok());
        let only_bad = headers(&["X-QQ-mid: t123t"]);
        assert!(resolve_date(&only_bad).is_err());
    }
}
