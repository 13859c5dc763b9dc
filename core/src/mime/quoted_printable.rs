/*
 * quoted_printable.rs
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

//! Quoted-Printable decoding (RFC 2045): =XX escapes and soft line breaks.

const HEX_DECODE: [i8; 256] = {
    let mut t = [-1i8; 256];
    let mut i = 0u8;
    while i < 10 {
        t[(b'0' + i) as usize] = i as i8;
        i += 1;
    }
    let mut i = 0u8;
    while i < 6 {
        t[(b'A' + i) as usize] = (10 + i) as i8;
        t[(b'a' + i) as usize] = (10 + i) as i8;
        i += 1;
    }
    t
};

/// Decode a complete quoted-printable buffer. Handles =XX, soft line breaks
/// (=CRLF and =LF), and leaves malformed escapes in place rather than failing.
pub fn decode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut pos = 0;
    while pos < src.len() {
        let b = src[pos];
        if b != b'=' {
            out.push(b);
            pos += 1;
            continue;
        }
        let rest = &src[pos + 1..];
        match rest {
            [h1, h2, ..] if HEX_DECODE[*h1 as usize] >= 0 && HEX_DECODE[*h2 as usize] >= 0 => {
                let v = (HEX_DECODE[*h1 as usize] << 4) | HEX_DECODE[*h2 as usize];
                out.push(v as u8);
                pos += 3;
            }
            [b'\r', b'\n', ..] => pos += 3,
            [b'\n', ..] => pos += 2,
            _ => {
                out.push(b);
                pos += 1;
            }
        }
    }
    out
}
