//! 7z backend.

use std::io;

use sevenz_rust::{Archive, BlockDecoder, Password, SevenZArchiveEntry, SevenZMethod};

use super::{
    ArchiveFormat, ArchiveItem, CopyError, EngineArchive, EngineOpenOptions, Source,
    copy_to_stream, stream_len, with_source_reader,
};
use crate::property::{PropertyId, PropertySource, RawProperty};
use crate::stream::OutStream;
use crate::volume::SplitLayout;
use crate::{EngineErrorCode, Error, Result};

/// Metadata of one 7z entry.
#[derive(Debug)]
struct SevenZipItem {
    index: u32,
    path: String,
    is_dir: bool,
    has_stream: bool,
    size: u64,
    pack_size: u64,
    attrib: Option<u32>,
    ctime: Option<u64>,
    atime: Option<u64>,
    mtime: Option<u64>,
    crc: Option<u32>,
    encrypted: bool,
}

impl SevenZipItem {
    fn new(index: u32, entry: &SevenZArchiveEntry, encrypted: bool) -> Self {
        Self {
            index,
            path: entry.name.clone(),
            is_dir: entry.is_directory,
            has_stream: entry.has_stream,
            size: entry.size,
            pack_size: entry.compressed_size,
            attrib: entry.has_windows_attributes.then_some(entry.windows_attributes),
            ctime: entry
                .has_creation_date
                .then(|| entry.creation_date.to_raw()),
            atime: entry.has_access_date.then(|| entry.access_date.to_raw()),
            mtime: entry
                .has_last_modified_date
                .then(|| entry.last_modified_date.to_raw()),
            crc: entry.has_crc.then_some(entry.crc as u32),
            encrypted,
        }
    }
}

impl PropertySource for SevenZipItem {
    fn property(&self, id: PropertyId) -> RawProperty {
        match id {
            PropertyId::PackSize if self.has_stream => RawProperty::UInt64(self.pack_size),
            PropertyId::Attrib => self.attrib.map_or(RawProperty::Unsupported, |a| {
                RawProperty::UInt64(u64::from(a))
            }),
            PropertyId::CTime => self.ctime.map_or(RawProperty::Unsupported, RawProperty::FileTime),
            PropertyId::ATime => self.atime.map_or(RawProperty::Unsupported, RawProperty::FileTime),
            PropertyId::MTime => self.mtime.map_or(RawProperty::Unsupported, RawProperty::FileTime),
            PropertyId::Encrypted => RawProperty::Bool(self.encrypted),
            PropertyId::Checksum => self
                .crc
                .map_or(RawProperty::Unsupported, |c| RawProperty::UInt64(u64::from(c))),
            PropertyId::Path => RawProperty::text(&self.path),
            PropertyId::IsDir => RawProperty::Bool(self.is_dir),
            PropertyId::Size => RawProperty::UInt64(self.size),
            _ => RawProperty::Unsupported,
        }
    }
}

impl ArchiveItem for SevenZipItem {
    fn index(&self) -> u32 {
        self.index
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn full_path(&self) -> &str {
        &self.path
    }
}

/// An open 7z archive.
pub(crate) struct SevenZipArchive {
    /// `None` once closed.
    archive: Option<Archive>,
    items: Vec<SevenZipItem>,
    physical_size: u64,
    solid: bool,
    password: Option<String>,
    layout: Option<SplitLayout>,
}

impl SevenZipArchive {
    pub(crate) fn open(
        source: Source<'_>,
        mut layout: Option<SplitLayout>,
        options: &EngineOpenOptions,
    ) -> Result<Self> {
        let password = password_bytes(options.password.as_deref());
        let password_given = !password.is_empty();
        let (archive, physical_size) = with_source_reader(source, &mut layout, |mut reader| {
            let len = stream_len(reader)?;
            let archive = Archive::read(&mut reader, len, &password)
                .map_err(|e| map_error(e, password_given))?;
            Ok((archive, len))
        })?;

        let items = archive
            .files
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let encrypted = archive
                    .stream_map
                    .file_folder_index
                    .get(i)
                    .copied()
                    .flatten()
                    .is_some_and(|folder| folder_is_encrypted(&archive, folder));
                SevenZipItem::new(i as u32, entry, encrypted)
            })
            .collect::<Vec<_>>();
        let solid = archive
            .folders
            .iter()
            .any(|folder| folder.num_unpack_sub_streams > 1);
        log::debug!(
            "7z archive: {} items, {} blocks, {physical_size} bytes",
            items.len(),
            archive.folders.len()
        );

        Ok(Self {
            archive: Some(archive),
            items,
            physical_size,
            solid,
            password: options.password.clone(),
            layout,
        })
    }

    fn archive(&self) -> Result<&Archive> {
        self.archive
            .as_ref()
            .ok_or_else(|| Error::engine(EngineErrorCode::NotInitialized))
    }
}

impl PropertySource for SevenZipArchive {
    fn property(&self, id: PropertyId) -> RawProperty {
        match id {
            PropertyId::PhySize => RawProperty::UInt64(self.physical_size),
            PropertyId::Solid => RawProperty::Bool(self.solid),
            _ => RawProperty::Unsupported,
        }
    }
}

impl EngineArchive for SevenZipArchive {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::SevenZip
    }

    fn item_count(&self) -> Result<u32> {
        self.archive()?;
        Ok(self.items.len() as u32)
    }

    fn item(&self, index: u32) -> Result<&dyn ArchiveItem> {
        self.archive()?;
        self.items
            .get(index as usize)
            .map(|item| item as &dyn ArchiveItem)
            .ok_or_else(|| {
                Error::engine_detail(
                    EngineErrorCode::Unknown,
                    format!("item index {index} out of range"),
                )
            })
    }

    fn extract(
        &mut self,
        index: u32,
        source: Source<'_>,
        out: &mut dyn OutStream,
        password: Option<&str>,
    ) -> Result<()> {
        let archive = self
            .archive
            .as_ref()
            .ok_or_else(|| Error::engine(EngineErrorCode::NotInitialized))?;
        let file_index = index as usize;
        let entry = archive.files.get(file_index).ok_or_else(|| {
            Error::engine_detail(
                EngineErrorCode::Unknown,
                format!("item index {index} out of range"),
            )
        })?;
        let Some(folder_index) = archive
            .stream_map
            .file_folder_index
            .get(file_index)
            .copied()
            .flatten()
        else {
            // Directories and empty files have no data
            return Ok(());
        };

        let password = password_bytes(password.or(self.password.as_deref()));
        let password_given = !password.is_empty();
        let mut write_error = None;
        let mut found = false;

        let outcome = with_source_reader(source, &mut self.layout, |mut reader| {
            let decoder = BlockDecoder::new(folder_index, archive, &password, &mut reader);
            Ok(decoder.for_each_entries(&mut |item, data| {
                if !std::ptr::eq(item, entry) {
                    io::copy(data, &mut io::sink()).map_err(sevenz_rust::Error::io)?;
                    return Ok(true);
                }
                found = true;
                match copy_to_stream(data, &mut *out) {
                    Ok(n) => {
                        log::trace!("extracted {} ({n} bytes)", item.name);
                        Ok(false)
                    }
                    Err(CopyError::Read(e)) => Err(sevenz_rust::Error::io(e)),
                    Err(CopyError::Write(e)) => {
                        write_error = Some(e);
                        Err(sevenz_rust::Error::other("output stream failed"))
                    }
                }
            }))
        })?;

        if let Some(e) = write_error {
            return Err(Error::Io(e));
        }
        match outcome {
            Ok(_) if found => Ok(()),
            Ok(_) => Err(Error::engine_detail(
                EngineErrorCode::Unknown,
                format!("item {index} not found in block {folder_index}"),
            )),
            Err(sevenz_rust::Error::Io(e, _)) if !password_given => Err(Error::engine_detail(
                EngineErrorCode::Unknown,
                format!("data error: {e}"),
            )),
            // garbage from a wrong key fails in the decompressor
            Err(sevenz_rust::Error::Io(e, _)) if folder_is_encrypted(archive, folder_index) => {
                Err(Error::engine_detail(
                    EngineErrorCode::NeedPassword,
                    format!("data error: {e}"),
                ))
            }
            Err(e) => Err(map_error(e, password_given)),
        }
    }

    fn close(&mut self) {
        if self.archive.take().is_some() {
            self.items.clear();
            self.layout = None;
            log::debug!("7z archive closed");
        }
    }
}

fn password_bytes(password: Option<&str>) -> Vec<u8> {
    match password {
        Some(p) if !p.is_empty() => Password::from(p).as_slice().to_vec(),
        _ => Vec::new(),
    }
}

fn folder_is_encrypted(archive: &Archive, folder: usize) -> bool {
    archive.folders.get(folder).is_some_and(|folder| {
        folder
            .coders
            .iter()
            .any(|coder| coder.decompression_method_id() == SevenZMethod::ID_AES256SHA256)
    })
}

/// Maps a backend error onto the engine error codes.
fn map_error(err: sevenz_rust::Error, password_given: bool) -> Error {
    use sevenz_rust::Error as E;

    let detail = err.to_string();
    match err {
        E::PasswordRequired | E::MaybeBadPassword(_) => {
            Error::engine_detail(EngineErrorCode::NeedPassword, detail)
        }
        E::BadSignature(_)
        | E::UnsupportedVersion { .. }
        | E::UnsupportedCompressionMethod(_)
        | E::ExternalUnsupported
        | E::Unsupported(_) => Error::engine_detail(EngineErrorCode::NotSupported, detail),
        E::Io(e, _) | E::FileOpen(e, _) => Error::Io(e),
        // A wrong password usually surfaces as a corrupt header
        _ if password_given => Error::engine_detail(EngineErrorCode::NeedPassword, detail),
        _ => Error::engine_detail(EngineErrorCode::Unknown, detail),
    }
}
