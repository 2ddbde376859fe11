//! Shared test utilities for integration tests.
//!
//! Archives are built in memory with the backend crates' writers, then
//! written into a temporary directory when a test needs files on disk.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// A small tree used by most tests: one directory, a nested file, a file
/// at the root and an empty file.
pub const TREE_DIRS: &[&str] = &["docs"];
pub const TREE_FILES: &[(&str, &[u8])] = &[
    ("docs/readme.txt", b"Read me first.\n"),
    ("docs/Guide.TXT", b"Step one. Step two.\n"),
    ("main.rs", b"fn main() {}\n"),
    ("empty.bin", b""),
];

/// FILETIME of 2001-09-09 01:46:40 UTC (Unix 1_000_000_000).
pub const MTIME_FILETIME: u64 = 116_444_736_000_000_000 + 1_000_000_000 * 10_000_000;

/// Deterministic, poorly compressible data of `len` bytes.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

#[cfg(feature = "sevenz")]
mod sevenz {
    use super::*;
    use sevenz_rust::nt_time::FileTime;
    use sevenz_rust::{SeqReader, SevenZArchiveEntry, SevenZWriter, SourceReader};

    fn file_entry(name: &str, size: usize) -> SevenZArchiveEntry {
        let mut entry = SevenZArchiveEntry::new();
        entry.name = name.to_string();
        entry.has_stream = size > 0;
        entry.size = size as u64;
        entry.has_last_modified_date = true;
        entry.last_modified_date = FileTime::new(MTIME_FILETIME);
        entry
    }

    fn dir_entry(name: &str) -> SevenZArchiveEntry {
        let mut entry = SevenZArchiveEntry::new();
        entry.name = name.to_string();
        entry.is_directory = true;
        entry
    }

    fn push_all(
        writer: &mut SevenZWriter<Cursor<Vec<u8>>>,
        files: &[(&str, &[u8])],
        dirs: &[&str],
    ) {
        for dir in dirs {
            writer
                .push_archive_entry::<&[u8]>(dir_entry(dir), None)
                .unwrap();
        }
        for (name, data) in files {
            // an empty reader would still be recorded as a stream
            let reader = (!data.is_empty()).then_some(*data);
            writer
                .push_archive_entry(file_entry(name, data.len()), reader)
                .unwrap();
        }
    }

    /// Creates a non-solid 7z archive, one block per file.
    pub fn sevenz_archive(files: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
        let mut writer = SevenZWriter::new(Cursor::new(Vec::new())).unwrap();
        push_all(&mut writer, files, dirs);
        writer.finish().unwrap().into_inner()
    }

    /// Creates a solid 7z archive holding every (non-empty) file in one block.
    pub fn sevenz_solid(files: &[(&str, &[u8])]) -> Vec<u8> {
        assert!(files.iter().all(|(_, data)| !data.is_empty()));
        let mut writer = SevenZWriter::new(Cursor::new(Vec::new())).unwrap();
        let entries = files
            .iter()
            .map(|(name, data)| file_entry(name, data.len()))
            .collect();
        let readers: SeqReader<_> = files
            .iter()
            .map(|(_, data)| SourceReader::from(*data))
            .collect::<Vec<_>>()
            .into();
        writer
            .push_archive_entries(entries, readers)
            .unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Creates an AES-256 encrypted 7z archive.
    ///
    /// With `encrypt_header` the item names are encrypted as well, so the
    /// archive cannot even be listed without the password.
    #[cfg(feature = "aes")]
    pub fn sevenz_encrypted(
        files: &[(&str, &[u8])],
        password: &str,
        encrypt_header: bool,
    ) -> Vec<u8> {
        use sevenz_rust::{AesEncoderOptions, Password, SevenZMethod};

        let mut writer = SevenZWriter::new(Cursor::new(Vec::new())).unwrap();
        writer.set_content_methods(vec![
            AesEncoderOptions::new(Password::from(password)).into(),
            SevenZMethod::LZMA2.into(),
        ]);
        writer.set_encrypt_header(encrypt_header);
        push_all(&mut writer, files, &[]);
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(feature = "sevenz")]
pub use sevenz::*;

/// Creates a zip archive; directories are added before files.
#[cfg(feature = "zip")]
pub fn zip_archive(files: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
    use zip::ZipWriter;
    use zip::write::FileOptions;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().unix_permissions(0o644);
    for dir in dirs {
        writer.add_directory(format!("{dir}/"), options).unwrap();
    }
    for (name, data) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Splits `bytes` into `base.001`, `base.002`, ... of at most `volume_size`
/// bytes each and returns the paths in order.
pub fn split_into_volumes(
    dir: &Path,
    base: &str,
    bytes: &[u8],
    volume_size: usize,
) -> Vec<PathBuf> {
    bytes
        .chunks(volume_size)
        .enumerate()
        .map(|(i, chunk)| write_file(dir, &format!("{base}.{:03}", i + 1), chunk))
        .collect()
}

/// Path as the `String` the session layer takes.
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
