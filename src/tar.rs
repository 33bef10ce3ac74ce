//! Deterministic POSIX ustar archive construction (C5).
//!
//! Hand-rolled rather than delegated to a generic archive crate: digests in
//! this system are computed over the writer's exact output bytes, and the
//! byte layout below (field offsets, checksum algorithm, padding rule) is
//! not part of any crate's public contract, only of this format. The `tar`
//! crate remains a dev-dependency used in tests to confirm a
//! standards-conformant reader can extract what this writer produced.

use crate::error::{ContainerToolError, Result};

const BLOCK_SIZE: usize = 512;
const DEFAULT_FILE_MODE: u32 = 0o555;
const DEFAULT_DIR_MODE: u32 = 0o555;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryType {
    File,
    Directory,
}

impl EntryType {
    fn typeflag(self) -> u8 {
        match self {
            EntryType::File => b'0',
            EntryType::Directory => b'5',
        }
    }
}

/// Incremental ustar archive builder. Append-only; entries compose
/// left-to-right in the order added. `into_bytes` yields the header/data
/// blocks concatenated with the two-block trailer.
#[derive(Debug, Default)]
pub struct TarWriter {
    out: Vec<u8>,
}

impl TarWriter {
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    /// Add a directory entry: a single header, `typeflag=5`, `size=0`.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        self.write_header(name, EntryType::Directory, 0)?;
        Ok(())
    }

    /// Add a regular file: header, data, zero padding to the next 512-byte
    /// boundary. Padding is `(512 - size mod 512) mod 512` — never a full
    /// 512-byte block, which would read as end-of-archive (§9).
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.write_header(name, EntryType::File, data.len() as u64)?;
        self.out.extend_from_slice(data);
        let padding = (BLOCK_SIZE - (data.len() % BLOCK_SIZE)) % BLOCK_SIZE;
        self.out.extend(std::iter::repeat(0u8).take(padding));
        Ok(())
    }

    /// Recursively add a directory tree in pre-order: a directory entry for
    /// each directory, a file entry for each regular file. Symlinks and
    /// other special files are rejected.
    pub fn add_dir_recursive(&mut self, fs_path: &std::path::Path, archive_prefix: &str) -> Result<()> {
        let prefix = archive_prefix.trim_end_matches('/');
        if !prefix.is_empty() {
            self.add_directory(&format!("{prefix}/"))?;
        }
        let mut entries: Vec<_> = std::fs::read_dir(fs_path)?.collect::<std::result::Result<_, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let file_type = entry.file_type()?;
            let name = entry.file_name().to_string_lossy().to_string();
            let archive_name = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            if file_type.is_dir() {
                self.add_dir_recursive(&entry.path(), &archive_name)?;
            } else if file_type.is_file() {
                let data = std::fs::read(entry.path())?;
                self.add_file(&archive_name, &data)?;
            } else {
                return Err(ContainerToolError::InvalidTarName(format!(
                    "{}: symlinks and special files are not supported",
                    entry.path().display()
                )));
            }
        }
        Ok(())
    }

    /// Finalize the archive: two all-zero 512-byte trailer blocks.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.out.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));
        self.out
    }

    fn write_header(&mut self, name: &str, kind: EntryType, size: u64) -> Result<()> {
        if name.is_empty() {
            return Err(ContainerToolError::InvalidTarName(name.to_string()));
        }
        let mode = match kind {
            EntryType::File => DEFAULT_FILE_MODE,
            EntryType::Directory => DEFAULT_DIR_MODE,
        };

        let mut header = [0u8; BLOCK_SIZE];

        let (path_part, prefix_part) = split_name_for_ustar(name)?;
        write_str(&mut header[0..100], &path_part);
        write_octal(&mut header[100..108], mode as u64, 6);
        write_octal(&mut header[108..116], 0, 6); // uid
        write_octal(&mut header[116..124], 0, 6); // gid
        write_octal(&mut header[124..136], size, 11);
        write_octal(&mut header[136..148], 0, 11); // mtime
        // chksum field (148..156) filled with spaces while computing the sum.
        header[148..156].fill(b' ');
        header[156] = kind.typeflag();
        write_str(&mut header[157..257], ""); // linkname
        header[257..263].copy_from_slice(b"ustar\0");
        header[263..265].copy_from_slice(b"00");
        write_str(&mut header[265..297], ""); // uname
        write_str(&mut header[297..329], ""); // gname
        write_octal(&mut header[329..337], 0, 6); // devmajor
        write_octal(&mut header[337..345], 0, 6); // devminor
        write_str(&mut header[345..500], &prefix_part);

        let checksum: u32 = header.iter().map(|&b| b as u32).sum();
        write_octal_space_terminated(&mut header[148..156], checksum as u64, 6);

        self.out.extend_from_slice(&header);
        Ok(())
    }
}

/// Split a long path into ustar's 100-byte `name` + 155-byte `prefix`
/// fields. If the whole path fits in 100 bytes, `prefix` is empty.
fn split_name_for_ustar(name: &str) -> Result<(String, String)> {
    if name.len() <= 100 {
        return Ok((name.to_string(), String::new()));
    }
    // Walk from the end to find the split point closest to the tail that
    // keeps both halves within their field widths.
    let bytes = name.as_bytes();
    let mut split_at = None;
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b'/' {
            let prefix = &name[..i];
            let suffix = &name[i + 1..];
            if prefix.len() <= 155 && suffix.len() <= 100 && !suffix.is_empty() {
                split_at = Some(i);
                break;
            }
        }
    }
    match split_at {
        Some(i) => Ok((name[i + 1..].to_string(), name[..i].to_string())),
        None => Err(ContainerToolError::InvalidTarName(format!(
            "{name}: path too long to represent in a ustar header"
        ))),
    }
}

fn write_str(field: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
}

/// Write `value` as octal digits, zero-padded to `digits`, followed by a
/// space and a NUL (the "space+null" termination used by most fields).
fn write_octal(field: &mut [u8], value: u64, digits: usize) {
    let s = format!("{value:0width$o}", width = digits);
    field[..digits].copy_from_slice(&s.as_bytes()[..digits]);
    if field.len() > digits {
        field[digits] = b' ';
    }
    if field.len() > digits + 1 {
        field[digits + 1] = 0;
    }
}

/// Checksum termination is NUL then space, per §4.5's field table.
fn write_octal_space_terminated(field: &mut [u8], value: u64, digits: usize) {
    let s = format!("{value:0width$o}", width = digits);
    field[..digits].copy_from_slice(&s.as_bytes()[..digits]);
    if field.len() > digits {
        field[digits] = 0;
    }
    if field.len() > digits + 1 {
        field[digits + 1] = b' ';
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_small_file_matches_expected_total_length() {
        let mut w = TarWriter::new();
        w.add_file("filename", b"test").unwrap();
        let bytes = w.into_bytes();
        // 512 header + 512 (4 bytes padded to a block) + 1024 trailer.
        assert_eq!(bytes.len(), 1536);
    }

    #[test]
    fn archive_length_is_always_a_multiple_of_512() {
        let mut w = TarWriter::new();
        w.add_file("a", &[1, 2, 3]).unwrap();
        w.add_file("b", &vec![7u8; 1000]).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len() % 512, 0);
    }

    #[test]
    fn trailer_is_two_zero_blocks() {
        let mut w = TarWriter::new();
        w.add_file("a", b"x").unwrap();
        let bytes = w.into_bytes();
        let trailer = &bytes[bytes.len() - 1024..];
        assert!(trailer.iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut w = TarWriter::new();
        assert!(w.add_file("", b"x").is_err());
    }

    #[test]
    fn round_trips_through_a_standards_conformant_reader() {
        let mut w = TarWriter::new();
        w.add_directory("bin/").unwrap();
        w.add_file("bin/hello", b"#!/bin/sh\necho hi\n").unwrap();
        let bytes = w.into_bytes();

        let mut archive = ::tar::Archive::new(std::io::Cursor::new(bytes));
        let mut found_file = false;
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().to_string();
            if path == "bin/hello" {
                found_file = true;
                let mut contents = Vec::new();
                std::io::Read::read_to_end(&mut entry, &mut contents).unwrap();
                assert_eq!(contents, b"#!/bin/sh\necho hi\n");
            }
        }
        assert!(found_file);
    }

    #[test]
    fn mode_and_ownership_match_expected_defaults() {
        let mut w = TarWriter::new();
        w.add_file("filename", b"test").unwrap();
        let bytes = w.into_bytes();

        let mut archive = ::tar::Archive::new(std::io::Cursor::new(bytes));
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        let header = entry.header();
        assert_eq!(header.mode().unwrap(), 0o555);
        assert_eq!(header.uid().unwrap(), 0);
        assert_eq!(header.gid().unwrap(), 0);
        assert_eq!(header.size().unwrap(), 4);
    }

    #[test]
    fn long_path_uses_prefix_field() {
        let long_dir = "a".repeat(120);
        let name = format!("{long_dir}/file.txt");
        let mut w = TarWriter::new();
        w.add_file(&name, b"data").unwrap();
        let bytes = w.into_bytes();

        let mut archive = ::tar::Archive::new(std::io::Cursor::new(bytes));
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        let path = entry.path().unwrap().to_string_lossy().to_string();
        assert_eq!(path, name);
    }
}
