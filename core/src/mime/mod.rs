/*
 * mod.rs
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

//! Header and MIME machinery: header block parsing, RFC 2047 decoding,
//! address lists, multipart attachment extraction.

mod address;
mod headers;
mod parts;
mod quoted_printable;
mod rfc2047;

pub use address::{parse_address_list, Mailbox};
pub use headers::HeaderMap;
pub use parts::{extract_attachments, AttachmentPart};
pub use rfc2047::decode_header_value;
