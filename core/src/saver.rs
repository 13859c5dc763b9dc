/*
 * saver.rs
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

//! Attachment placement: a pure mapping from message metadata to a
//! destination directory, plus the collision-safe filesystem writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DownloadError;
use crate::message::MessageInfo;

/// Maximum length of a directory-name component derived from free-form
/// mail fields (subjects can be arbitrarily long).
const MAX_COMPONENT_LEN: usize = 51;

/// Fallback when a component sanitizes to nothing.
const EMPTY_COMPONENT: &str = "unnamed";

/// Directory layout under the save root, selected once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStrategy {
    /// 0: everything in the root directory.
    Flat,
    /// 1: one directory per sender address.
    ByAddress,
    /// 2: one directory per subject.
    BySubject,
    /// 3: one directory per sender address, then per subject.
    ByAddressThenSubject,
    /// 4: one directory per sender display name.
    ByAlias,
    /// 5: one directory per subject, prefixed with the send date (YYYY-MM-DD).
    BySubjectWithDate,
}

impl SaveStrategy {
    /// Map a numeric save mode to a strategy. Unknown modes are a
    /// configuration error, rejected at startup rather than per file.
    pub fn from_mode(mode: u8) -> Result<SaveStrategy, DownloadError> {
        match mode {
            0 => Ok(SaveStrategy::Flat),
            1 => Ok(SaveStrategy::ByAddress),
            2 => Ok(SaveStrategy::BySubject),
            3 => Ok(SaveStrategy::ByAddressThenSubject),
            4 => Ok(SaveStrategy::ByAlias),
            5 => Ok(SaveStrategy::BySubjectWithDate),
            other => Err(DownloadError::Config(format!(
                "unknown save mode {} (expected 0..=5)",
                other
            ))),
        }
    }

    /// Resolve the destination directory for a message. Pure function of
    /// (root, metadata); does not touch the filesystem.
    pub fn resolve(&self, root: &Path, info: &MessageInfo) -> PathBuf {
        match self {
            SaveStrategy::Flat => root.to_path_buf(),
            SaveStrategy::ByAddress => root.join(sanitize_component(&info.from_address)),
            SaveStrategy::BySubject => root.join(sanitize_component(&info.subject)),
            SaveStrategy::ByAddressThenSubject => root
                .join(sanitize_component(&info.from_address))
                .join(sanitize_component(&info.subject)),
            SaveStrategy::ByAlias => root.join(sanitize_component(&info.from_name)),
            SaveStrategy::BySubjectWithDate => root.join(sanitize_component(&format!(
                "{} {}",
                info.date.format("%Y-%m-%d"),
                info.subject
            ))),
        }
    }
}

/// Sanitize a free-form mail field for use as one path segment: drop
/// characters that are illegal or separator-like in path segments, clamp
/// the length, trim surrounding whitespace.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '*' | '"' | '/' | '\\' | ':' | '?' | '|' | '<' | '>' | '\n'))
        .take(MAX_COMPONENT_LEN)
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        EMPTY_COMPONENT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// External collaborator that persists attachment bytes. The contract:
/// directories are created as needed and an existing name is never
/// overwritten.
pub trait AttachmentWriter {
    /// Write `data` into `dir` under `file_name` (or a collision-free
    /// variant of it). Returns the path actually written.
    fn save(&mut self, dir: &Path, file_name: &str, data: &[u8]) -> io::Result<PathBuf>;
}

/// Filesystem writer. Collision safety holds under the single-writer
/// assumption only; concurrent runs against the same root can race on the
/// existence check.
#[derive(Debug, Default)]
pub struct FsWriter;

impl AttachmentWriter for FsWriter {
    fn save(&mut self, dir: &Path, file_name: &str, data: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let target = dir.join(unique_file_name(dir, file_name));
        fs::write(&target, data)?;
        Ok(target)
    }
}

/// First free variant of `file_name` in `dir`: the name itself, then
/// `stem_2.ext`, `stem_3.ext`, ... The original name is used exactly once.
fn unique_file_name(dir: &Path, file_name: &str) -> String {
    if !dir.join(file_name).exists() {
        return file_name.to_string();
    }
    let (stem, ext) = split_extension(file_name);
    let mut counter = 2u32;
    loop {
        let candidate = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Split at the last dot. Dotfiles ("\.bashrc") and extensionless names
/// count as all-stem.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (file_name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn info() -> MessageInfo {
        MessageInfo {
            id: "1".to_string(),
            date: Utc.with_ymd_and_hms(2020, 1, 4, 3, 59, 25).unwrap(),
            subject: "Homework: week 1?".to_string(),
            from_address: "student@example.com".to_string(),
            from_name: "Li Lei".to_string(),
            to_addresses: vec![],
            to_names: vec![],
            size: None,
            attachment_names: vec![],
        }
    }

    #[test]
    fn unknown_mode_is_config_error() {
        assert!(SaveStrategy::from_mode(5).is_ok());
        assert!(matches!(
            SaveStrategy::from_mode(6),
            Err(DownloadError::Config(_))
        ));
    }

    #[test]
    fn flat_mode_resolves_to_root_unmodified() {
        let root = Path::new("/data/mail");
        assert_eq!(SaveStrategy::Flat.resolve(root, &info()), root);
    }

    #[test]
    fn classified_modes() {
        let root = Path::new("/data");
        let i = info();
        assert_eq!(
            SaveStrategy::ByAddress.resolve(root, &i),
            Path::new("/data/student@example.com")
        );
        assert_eq!(
            SaveStrategy::BySubject.resolve(root, &i),
            Path::new("/data/Homework week 1")
        );
        assert_eq!(
            SaveStrategy::ByAddressThenSubject.resolve(root, &i),
            Path::new("/data/student@example.com/Homework week 1")
        );
        assert_eq!(
            SaveStrategy::ByAlias.resolve(root, &i),
            Path::new("/data/Li Lei")
        );
        assert_eq!(
            SaveStrategy::BySubjectWithDate.resolve(root, &i),
            Path::new("/data/2020-01-04 Homework week 1")
        );
    }

    #[test]
    fn sanitize_strips_and_clamps() {
        assert_eq!(sanitize_component("a/b:c*d?e"), "abcde");
        assert_eq!(sanitize_component("  padded  "), "padded");
        assert_eq!(sanitize_component("::"), "unnamed");
        let long = "x".repeat(200);
        assert_eq!(sanitize_component(&long).len(), MAX_COMPONENT_LEN);
    }

    #[test]
    fn collision_suffixes_are_injective() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FsWriter;
        let mut written = Vec::new();
        for i in 0..4 {
            let path = writer
                .save(dir.path(), "dup.txt", format!("v{}", i).as_bytes())
                .unwrap();
            written.push(path);
        }
        assert_eq!(written[0].file_name().unwrap(), "dup.txt");
        assert_eq!(written[1].file_name().unwrap(), "dup_2.txt");
        assert_eq!(written[2].file_name().unwrap(), "dup_3.txt");
        assert_eq!(written[3].file_name().unwrap(), "dup_4.txt");
        let unique: std::collections::HashSet<_> = written.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(std::fs::read(&written[3]).unwrap(), b"v3");
    }

    #[test]
    fn extensionless_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FsWriter;
        writer.save(dir.path(), "README", b"a").unwrap();
        let second = writer.save(dir.path(), "README", b"b").unwrap();
        assert_eq!(second.file_name().unwrap(), "README_2");
    }

    #[test]
    fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut writer = FsWriter;
        let path = writer.save(&nested, "f.bin", b"data").unwrap();
        assert!(path.exists());
    }
}
