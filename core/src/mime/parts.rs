/*
 * parts.rs
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

//! Multipart walk over a full raw message: find every part carrying a
//! filename and decode its payload per Content-Transfer-Encoding.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use crate::mime::headers::HeaderMap;
use crate::mime::quoted_printable;
use crate::mime::rfc2047::decode_header_value;

/// Nesting guard against pathological or self-referencing boundaries.
const MAX_DEPTH: usize = 16;

/// One attachment found in a message: decoded filename and decoded payload.
#[derive(Debug, Clone)]
pub struct AttachmentPart {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Walk a full raw message and return every part that carries a filename,
/// in document order. Malformed structure yields fewer parts, never an error.
pub fn extract_attachments(raw: &[u8]) -> Vec<AttachmentPart> {
    let mut out = Vec::new();
    walk_entity(raw, &mut out, 0);
    out
}

fn walk_entity(entity: &[u8], out: &mut Vec<AttachmentPart>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    let (header_bytes, body) = split_header_body(entity);
    let headers = HeaderMap::parse(header_bytes);

    let content_type = headers.get("Content-Type").unwrap_or("");
    let (mime_type, ct_params) = parse_field_params(content_type);
    if mime_type.to_ascii_lowercase().starts_with("multipart/") {
        if let Some(boundary) = param_value(&ct_params, "boundary") {
            for part in split_multipart(body, boundary) {
                walk_entity(part, out, depth + 1);
            }
            return;
        }
    }
    if mime_type.eq_ignore_ascii_case("message/rfc822") {
        // Forwarded message: the body is a complete embedded entity.
        walk_entity(body, out, depth + 1);
        return;
    }

    let disposition = headers.get("Content-Disposition").unwrap_or("");
    let (_, cd_params) = parse_field_params(disposition);
    let raw_name = param_value(&cd_params, "filename").or_else(|| param_value(&ct_params, "name"));
    if let Some(raw_name) = raw_name {
        let cte = headers
            .get("Content-Transfer-Encoding")
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        out.push(AttachmentPart {
            file_name: decode_header_value(raw_name),
            data: decode_body(body, &cte),
        });
    }
}

/// Split an entity at the first empty line. Without one the whole buffer is
/// header (malformed/truncated message) and the body is empty.
pub fn split_header_body(entity: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < entity.len() {
        match entity[pos..].iter().position(|&b| b == b'\n') {
            Some(i) => {
                let line_end = pos + i;
                let line = &entity[pos..line_end];
                let line = if line.ends_with(b"\r") { &line[..line.len() - 1] } else { line };
                if line.is_empty() {
                    return (&entity[..pos], &entity[line_end + 1..]);
                }
                pos = line_end + 1;
            }
            None => break,
        }
    }
    (entity, &[])
}

/// Split a multipart body into its parts. Delimiter lines are `--boundary`;
/// `--boundary--` closes. The CRLF preceding a delimiter belongs to the
/// delimiter, not the part.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delim = format!("--{}", boundary);
    let delim = delim.as_bytes();
    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i)
            .unwrap_or(body.len());
        let mut line = &body[pos..line_end];
        if line.ends_with(b"\r") {
            line = &line[..line.len() - 1];
        }
        if line.starts_with(delim) {
            if let Some(start) = part_start {
                let mut end = pos;
                if end > start && body[end - 1] == b'\n' {
                    end -= 1;
                    if end > start && body[end - 1] == b'\r' {
                        end -= 1;
                    }
                }
                parts.push(&body[start..end]);
            }
            if line[delim.len()..].starts_with(b"--") {
                return parts;
            }
            part_start = Some((line_end + 1).min(body.len()));
        }
        pos = line_end + 1;
    }
    // Missing close delimiter: keep what was collected so far.
    parts
}

/// Split a structured field like `application/pdf; name="x.pdf"` into its
/// leading value and parameter list. Quoted parameter values may contain
/// semicolons.
pub fn parse_field_params(value: &str) -> (&str, Vec<(String, String)>) {
    let (head, rest) = match find_unquoted(value, ';') {
        Some(i) => (value[..i].trim(), &value[i + 1..]),
        None => (value.trim(), ""),
    };
    let mut params = Vec::new();
    let mut remaining = rest;
    while !remaining.trim().is_empty() {
        let (piece, tail) = match find_unquoted(remaining, ';') {
            Some(i) => (&remaining[..i], &remaining[i + 1..]),
            None => (remaining, ""),
        };
        if let Some((name, raw)) = piece.split_once('=') {
            let val = raw.trim().trim_matches('"');
            params.push((name.trim().to_ascii_lowercase(), val.to_string()));
        }
        remaining = tail;
    }
    (head, params)
}

fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn param_value<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// Decode a part body per Content-Transfer-Encoding. Identity encodings
/// (7bit, 8bit, binary, absent) pass the bytes through.
fn decode_body(body: &[u8], cte: &str) -> Vec<u8> {
    match cte {
        "base64" => {
            let cleaned: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
                .collect();
            STANDARD_NO_PAD.decode(&cleaned).unwrap_or_default()
        }
        "quoted-printable" => quoted_printable::decode(body),
        _ => body.to_vec(),
    }
}
