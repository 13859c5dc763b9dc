/*
 * rfc2047.rs
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

//! RFC 2047 encoded-word decoding (e.g. =?charset?B?text?=) for header values.
//!
//! A header value is treated as a sequence of segments: encoded-words and
//! plain text between them. Each segment decodes independently and the
//! decoded segments are joined with a single space. Decoding is total:
//! undecodable bytes become U+FFFD, malformed encoded-words pass through
//! as literal text.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use crate::mime::quoted_printable;

/// Decode a header value that may contain RFC 2047 encoded-words.
///
/// Plain text input comes back unchanged apart from surrounding whitespace,
/// which makes the function idempotent on already-decoded values.
pub fn decode_header_value(raw: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let bytes = raw.as_bytes();
    let len = bytes.len();
    let mut pos = 0;
    let mut literal_start = 0;

    while pos < len {
        if bytes[pos] == b'=' && pos + 1 < len && bytes[pos + 1] == b'?' {
            if let Some((decoded, end)) = decode_one_encoded_word(raw, pos) {
                push_literal(&mut segments, &raw[literal_start..pos]);
                segments.push(decoded);
                pos = end;
                literal_start = end;
                continue;
            }
        }
        pos += 1;
    }
    push_literal(&mut segments, &raw[literal_start..]);
    segments.join(" ")
}

fn push_literal(segments: &mut Vec<String>, literal: &str) {
    let trimmed = literal.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}

/// Decode one encoded-word starting at `start` (which points at "=?").
/// Returns (decoded text, byte offset just past the closing "?=").
fn decode_one_encoded_word(raw: &str, start: usize) -> Option<(String, usize)> {
    let rest = &raw[start + 2..];
    let q1 = rest.find('?')?;
    let charset = &rest[..q1];
    let after_charset = &rest[q1 + 1..];
    let q2 = after_charset.find('?')?;
    if q2 != 1 {
        return None;
    }
    let encoding = after_charset.as_bytes()[0].to_ascii_lowercase();
    let payload_area = &after_charset[2..];
    let end_rel = payload_area.find("?=")?;
    let payload = &payload_area[..end_rel];

    let decoded_bytes = match encoding {
        b'b' => decode_b(payload),
        b'q' => decode_q(payload),
        _ => return None,
    };
    let end = start + 2 + q1 + 1 + 2 + end_rel + 2;
    Some((charset_bytes_to_string(&decoded_bytes, Some(charset)), end))
}

fn decode_b(payload: &str) -> Vec<u8> {
    // Forgiving base64: drop anything outside the alphabet (folding
    // whitespace inside the payload is common) and ignore padding.
    let cleaned: Vec<u8> = payload
        .bytes()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();
    STANDARD_NO_PAD.decode(&cleaned).unwrap_or_default()
}

/// Q encoding: underscore is space, the rest is quoted-printable.
fn decode_q(payload: &str) -> Vec<u8> {
    let mut preprocessed = Vec::with_capacity(payload.len());
    for b in payload.bytes() {
        if b == b'_' {
            preprocessed.push(b' ');
        } else {
            preprocessed.push(b);
        }
    }
    quoted_printable::decode(&preprocessed)
}

/// Decode charset-tagged bytes to text. The aliases gbk/gb2312/gb18030 all
/// decode as GB18030: mislabeling between the three is common and GB18030
/// is a superset of the other two. No declared charset means
/// replacement-on-error UTF-8. The declared charset is authoritative:
/// leading BOM-lookalike bytes decode under it instead of switching the
/// decoder.
pub fn charset_bytes_to_string(bytes: &[u8], charset: Option<&str>) -> String {
    let charset = match charset {
        Some(c) => c.trim(),
        None => return String::from_utf8_lossy(bytes).into_owned(),
    };
    if charset.eq_ignore_ascii_case("gbk")
        || charset.eq_ignore_ascii_case("gb2312")
        || charset.eq_ignore_ascii_case("gb18030")
    {
        let (text, _) = encoding_rs::GB18030.decode_without_bom_handling(bytes);
        return text.into_owned();
    }
    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(enc) => {
            let (text, _) = enc.decode_without_bom_handling(bytes);
            text.into_owned()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}
