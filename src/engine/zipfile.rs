//! Zip backend.

use zip::result::{InvalidPassword, ZipError};
use zip::{DateTime, ZipArchive};

use super::{
    ArchiveFormat, ArchiveItem, CopyError, EngineArchive, EngineOpenOptions, Source,
    copy_to_stream, stream_len, with_source_reader,
};
use crate::property::{PropertyId, PropertySource, RawProperty};
use crate::stream::OutStream;
use crate::timestamp::Timestamp;
use crate::volume::SplitLayout;
use crate::{EngineErrorCode, Error, Result};

/// Marks the high word of the attributes as Unix mode bits.
const FILE_ATTRIBUTE_UNIX_EXTENSION: u32 = 0x8000;
const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;

#[derive(Debug)]
struct ZipItem {
    index: u32,
    path: String,
    is_dir: bool,
    size: u64,
    pack_size: u64,
    crc: u32,
    mtime: Option<u64>,
    unix_mode: Option<u32>,
    comment: String,
    encrypted: bool,
}

impl PropertySource for ZipItem {
    fn property(&self, id: PropertyId) -> RawProperty {
        match id {
            PropertyId::PackSize => RawProperty::UInt64(self.pack_size),
            PropertyId::Attrib => match self.unix_mode {
                Some(mode) => {
                    let mut attrib = (mode << 16) | FILE_ATTRIBUTE_UNIX_EXTENSION;
                    if self.is_dir {
                        attrib |= FILE_ATTRIBUTE_DIRECTORY;
                    }
                    RawProperty::UInt64(u64::from(attrib))
                }
                None => RawProperty::Unsupported,
            },
            PropertyId::MTime => self.mtime.map_or(RawProperty::Unsupported, RawProperty::FileTime),
            PropertyId::Encrypted => RawProperty::Bool(self.encrypted),
            PropertyId::Comment if !self.comment.is_empty() => RawProperty::text(&self.comment),
            PropertyId::Checksum => RawProperty::UInt64(u64::from(self.crc)),
            PropertyId::Path => RawProperty::text(&self.path),
            PropertyId::IsDir => RawProperty::Bool(self.is_dir),
            PropertyId::Size => RawProperty::UInt64(self.size),
            _ => RawProperty::Unsupported,
        }
    }
}

impl ArchiveItem for ZipItem {
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

/// An open zip archive.
pub(crate) struct ZipArchiveHandle {
    items: Vec<ZipItem>,
    comment: String,
    physical_size: u64,
    password: Option<String>,
    layout: Option<SplitLayout>,
    closed: bool,
}

impl ZipArchiveHandle {
    pub(crate) fn open(
        source: Source<'_>,
        mut layout: Option<SplitLayout>,
        options: &EngineOpenOptions,
    ) -> Result<Self> {
        let (items, comment, physical_size) = with_source_reader(source, &mut layout, |reader| {
            let physical_size = stream_len(reader)?;
            let mut zip = ZipArchive::new(reader).map_err(map_error)?;
            let comment = String::from_utf8_lossy(zip.comment()).into_owned();
            let mut items = Vec::with_capacity(zip.len());
            for i in 0..zip.len() {
                let mut item = {
                    let file = zip.by_index_raw(i).map_err(map_error)?;
                    ZipItem {
                        index: i as u32,
                        path: file.name().to_string(),
                        is_dir: file.is_dir(),
                        size: file.size(),
                        pack_size: file.compressed_size(),
                        crc: file.crc32(),
                        mtime: dos_datetime_to_filetime(file.last_modified()),
                        unix_mode: file.unix_mode(),
                        comment: file.comment().to_string(),
                        encrypted: false,
                    }
                };
                item.encrypted = matches!(
                    zip.by_index(i),
                    Err(ZipError::UnsupportedArchive(ZipError::PASSWORD_REQUIRED))
                );
                items.push(item);
            }
            Ok((items, comment, physical_size))
        })?;
        log::debug!("zip archive: {} items, {physical_size} bytes", items.len());

        Ok(Self {
            items,
            comment,
            physical_size,
            password: options.password.clone(),
            layout,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::engine(EngineErrorCode::NotInitialized));
        }
        Ok(())
    }
}

impl PropertySource for ZipArchiveHandle {
    fn property(&self, id: PropertyId) -> RawProperty {
        match id {
            PropertyId::PhySize => RawProperty::UInt64(self.physical_size),
            PropertyId::Comment if !self.comment.is_empty() => RawProperty::text(&self.comment),
            _ => RawProperty::Unsupported,
        }
    }
}

impl EngineArchive for ZipArchiveHandle {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn item_count(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.items.len() as u32)
    }

    fn item(&self, index: u32) -> Result<&dyn ArchiveItem> {
        self.ensure_open()?;
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
        self.ensure_open()?;
        let password = password.or(self.password.as_deref());
        let encrypted = self
            .items
            .get(index as usize)
            .is_some_and(|item| item.encrypted);

        with_source_reader(source, &mut self.layout, |reader| {
            let mut zip = ZipArchive::new(reader).map_err(map_error)?;
            let mut file = match password {
                Some(password) if encrypted => zip
                    .by_index_decrypt(index as usize, password.as_bytes())
                    .map_err(map_error)?
                    .map_err(|InvalidPassword| {
                        Error::engine_detail(EngineErrorCode::NeedPassword, "invalid password")
                    })?,
                _ => zip.by_index(index as usize).map_err(map_error)?,
            };
            match copy_to_stream(&mut file, out) {
                Ok(n) => {
                    log::trace!("extracted {} ({n} bytes)", file.name());
                    Ok(())
                }
                Err(CopyError::Write(e)) => Err(Error::Io(e)),
                Err(CopyError::Read(e)) => Err(Error::engine_detail(
                    EngineErrorCode::Unknown,
                    format!("data error: {e}"),
                )),
            }
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.items.clear();
            self.layout = None;
            log::debug!("zip archive closed");
        }
    }
}

fn map_error(err: ZipError) -> Error {
    let detail = err.to_string();
    match err {
        ZipError::UnsupportedArchive(ZipError::PASSWORD_REQUIRED) => {
            Error::engine_detail(EngineErrorCode::NeedPassword, detail)
        }
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            Error::engine_detail(EngineErrorCode::NotSupported, detail)
        }
        ZipError::Io(e) => Error::Io(e),
        ZipError::FileNotFound => Error::engine_detail(EngineErrorCode::Unknown, detail),
    }
}

/// Converts a DOS date and time, taken as UTC, to FILETIME ticks.
fn dos_datetime_to_filetime(datetime: DateTime) -> Option<u64> {
    let days = days_from_civil(
        i64::from(datetime.year()),
        i64::from(datetime.month()),
        i64::from(datetime.day()),
    );
    let secs = days * 86_400
        + i64::from(datetime.hour()) * 3_600
        + i64::from(datetime.minute()) * 60
        + i64::from(datetime.second());
    Timestamp::from_unix_secs(secs).map(|t| t.as_filetime())
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let day_of_year = (153 * ((month + 9) % 12) + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}
