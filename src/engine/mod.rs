//! Archive engine seam.
//!
//! An [`Engine`] opens archives from a [`Source`] and hands back an
//! [`EngineArchive`]. The archive handle does not keep the source; every
//! extraction receives it again, so the caller stays in charge of when the
//! backing streams are released.
//!
//! [`BuiltinEngine`] dispatches to the 7z and zip backends compiled into the
//! crate.

#[cfg(feature = "sevenz")]
mod sevenz;
#[cfg(feature = "zip")]
mod zipfile;

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use crate::archive_path::{split_volume_suffix, type_extension};
use crate::property::PropertySource;
use crate::stream::{InStream, OutStream, StreamReader};
use crate::volume::{SplitLayout, SplitReader, VolumeCallback};
use crate::{EngineErrorCode, Error, Result};

/// 7z signature header bytes.
pub const SEVENZ_SIGNATURE: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Zip local file header signature.
pub const ZIP_LOCAL_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// Zip end of central directory signature, found first in empty archives.
pub const ZIP_EMPTY_SIGNATURE: [u8; 4] = *b"PK\x05\x06";

/// Where archive bytes come from.
pub enum Source<'a> {
    /// A single stream.
    Stream(&'a mut dyn InStream),
    /// A split archive reached through volume callbacks.
    Volumes(&'a mut dyn VolumeCallback),
}

impl Source<'_> {
    /// Reborrows the source for a shorter lifetime.
    pub fn reborrow(&mut self) -> Source<'_> {
        match self {
            Source::Stream(stream) => Source::Stream(&mut **stream),
            Source::Volumes(volumes) => Source::Volumes(&mut **volumes),
        }
    }

    /// Type extension used to pick a format.
    ///
    /// For volumes the numeric suffix of the first volume name is skipped,
    /// so `data.7z.001` selects `7z`. A forced type always wins.
    pub fn type_hint(&mut self) -> Option<String> {
        let hint = match self {
            Source::Stream(stream) => Some(stream.extension().to_string()),
            Source::Volumes(volumes) => {
                let first = volumes.first_volume_name().to_string();
                let extension = volumes
                    .open_current_volume_stream()
                    .map(|s| s.extension().to_string())
                    .unwrap_or_default();
                if !extension.is_empty() && !extension.bytes().all(|b| b.is_ascii_digit()) {
                    return Some(extension);
                }
                split_volume_suffix(&first)
                    .and_then(|(base, _)| type_extension(base))
                    .map(str::to_string)
            }
        };
        hint.filter(|ext| !ext.is_empty())
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stream(stream) => write!(f, "Stream({:?})", stream.extension()),
            Source::Volumes(volumes) => write!(f, "Volumes({:?})", volumes.first_volume_name()),
        }
    }
}

/// Options for [`Engine::open`].
#[derive(Debug, Clone, Default)]
pub struct EngineOpenOptions {
    /// Password for encrypted headers.
    pub password: Option<String>,
    /// Sniff the format from the archive signature.
    pub detect_type: bool,
}

/// Archive formats known to the builtin engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// 7z archives.
    SevenZip,
    /// Zip archives.
    Zip,
}

impl ArchiveFormat {
    /// Formats compiled into this build.
    pub fn enabled() -> Vec<ArchiveFormat> {
        let mut formats = Vec::new();
        if cfg!(feature = "sevenz") {
            formats.push(ArchiveFormat::SevenZip);
        }
        if cfg!(feature = "zip") {
            formats.push(ArchiveFormat::Zip);
        }
        formats
    }

    /// Short format name.
    pub fn name(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Zip => "zip",
        }
    }

    /// Type extensions that select this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ArchiveFormat::SevenZip => &["7z"],
            ArchiveFormat::Zip => &["zip", "jar"],
        }
    }

    /// Looks up an enabled format by type extension, ignoring case.
    pub fn from_extension(extension: &str) -> Option<ArchiveFormat> {
        Self::enabled().into_iter().find(|format| {
            format
                .extensions()
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(extension))
        })
    }

    /// Identifies an enabled format from the leading bytes of an archive.
    pub fn detect(header: &[u8]) -> Option<ArchiveFormat> {
        let format = if header.starts_with(&SEVENZ_SIGNATURE) {
            ArchiveFormat::SevenZip
        } else if header.starts_with(&ZIP_LOCAL_SIGNATURE)
            || header.starts_with(&ZIP_EMPTY_SIGNATURE)
        {
            ArchiveFormat::Zip
        } else {
            return None;
        };
        Self::enabled().contains(&format).then_some(format)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One item of an open archive.
pub trait ArchiveItem: PropertySource {
    /// Position of the item in the archive.
    fn index(&self) -> u32;

    /// Whether the item is a directory.
    fn is_dir(&self) -> bool;

    /// Path as stored in the archive, before normalization.
    fn full_path(&self) -> &str;
}

/// An open archive.
pub trait EngineArchive: PropertySource {
    /// Format of the archive.
    fn format(&self) -> ArchiveFormat;

    /// Number of items.
    fn item_count(&self) -> Result<u32>;

    /// Item at `index`.
    fn item(&self, index: u32) -> Result<&dyn ArchiveItem>;

    /// Decodes the item at `index` into `out`.
    ///
    /// `source` must be the source the archive was opened from.
    fn extract(
        &mut self,
        index: u32,
        source: Source<'_>,
        out: &mut dyn OutStream,
        password: Option<&str>,
    ) -> Result<()>;

    /// Releases engine resources. Further calls fail with
    /// [`EngineErrorCode::NotInitialized`].
    fn close(&mut self);
}

/// An archive engine.
pub trait Engine {
    /// Engine name for diagnostics.
    fn name(&self) -> &str;

    /// Type extensions the engine can open.
    fn supported_extensions(&self) -> Vec<String>;

    /// Opens an archive.
    fn open(&self, source: Source<'_>, options: &EngineOpenOptions)
    -> Result<Box<dyn EngineArchive>>;
}

/// The engine backed by the formats compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }

    fn select_format(
        &self,
        source: &mut Source<'_>,
        layout: &mut Option<SplitLayout>,
        detect_type: bool,
    ) -> Result<ArchiveFormat> {
        let hint = source.type_hint();
        let by_extension = hint.as_deref().and_then(ArchiveFormat::from_extension);

        if detect_type {
            let detected = with_source_reader(source.reborrow(), layout, |reader| {
                let mut header = [0u8; 6];
                let n = read_up_to(reader, &mut header)?;
                reader.seek(SeekFrom::Start(0))?;
                Ok(ArchiveFormat::detect(&header[..n]))
            })?;
            if let Some(format) = detected {
                log::debug!("detected {format} archive from signature");
                return Ok(format);
            }
        }

        by_extension.ok_or_else(|| {
            Error::engine_detail(
                EngineErrorCode::NotSupported,
                format!("no archive format for type {:?}", hint.unwrap_or_default()),
            )
        })
    }
}

impl Engine for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn supported_extensions(&self) -> Vec<String> {
        ArchiveFormat::enabled()
            .into_iter()
            .flat_map(|format| format.extensions().iter().map(|ext| ext.to_string()))
            .collect()
    }

    fn open(
        &self,
        mut source: Source<'_>,
        options: &EngineOpenOptions,
    ) -> Result<Box<dyn EngineArchive>> {
        let mut layout = None;
        let format = self.select_format(&mut source, &mut layout, options.detect_type)?;
        log::debug!("opening {format} archive from {source:?}");

        match format {
            #[cfg(feature = "sevenz")]
            ArchiveFormat::SevenZip => {
                let archive = sevenz::SevenZipArchive::open(source, layout, options)?;
                Ok(Box::new(archive))
            }
            #[cfg(feature = "zip")]
            ArchiveFormat::Zip => {
                let archive = zipfile::ZipArchiveHandle::open(source, layout, options)?;
                Ok(Box::new(archive))
            }
            #[allow(unreachable_patterns)]
            other => Err(Error::engine_detail(
                EngineErrorCode::NotSupported,
                format!("{other} support is not compiled in"),
            )),
        }
    }
}

/// `Read + Seek` as one object-safe trait.
pub(crate) trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Runs `f` with a `std::io` reader over `source`.
///
/// Split sources are measured once and the layout is kept in `cache` for
/// later calls.
pub(crate) fn with_source_reader<T>(
    source: Source<'_>,
    cache: &mut Option<SplitLayout>,
    f: impl FnOnce(&mut dyn ReadSeek) -> Result<T>,
) -> Result<T> {
    match source {
        Source::Stream(stream) => {
            let mut reader = StreamReader::new(stream);
            reader.seek(SeekFrom::Start(0))?;
            f(&mut reader)
        }
        Source::Volumes(volumes) => {
            let layout = match cache.take() {
                Some(layout) => layout,
                None => SplitLayout::probe(volumes)?,
            };
            let result = {
                let mut reader = SplitReader::new(volumes, &layout);
                f(&mut reader)
            };
            *cache = Some(layout);
            result
        }
    }
}

/// Reads until `buf` is full or the stream ends.
pub(crate) fn read_up_to(reader: &mut dyn ReadSeek, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Length of the logical stream, leaving the reader at the start.
pub(crate) fn stream_len(reader: &mut dyn ReadSeek) -> io::Result<u64> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/// Which side of a copy failed.
#[derive(Debug)]
pub(crate) enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Copies decoded bytes into an engine output stream.
///
/// The output may accept short writes; a write of zero bytes is retried
/// as long as it keeps making progress overall.
pub(crate) fn copy_to_stream(
    reader: &mut dyn Read,
    out: &mut dyn OutStream,
) -> std::result::Result<u64, CopyError> {
    let mut buf = [0u8; crate::READ_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        let mut written = 0;
        let mut stalls = 0;
        while written < n {
            match out.write(&buf[written..n]) {
                Ok(0) => {
                    stalls += 1;
                    if stalls > MAX_WRITE_STALLS {
                        return Err(CopyError::Write(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "output stream accepted no data",
                        )));
                    }
                }
                Ok(m) => {
                    written += m;
                    stalls = 0;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(CopyError::Write(e)),
            }
        }
        total += n as u64;
    }
}

const MAX_WRITE_STALLS: u32 = 1024;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{Bytes, Sink};

    #[test]
    fn test_format_from_extension() {
        #[cfg(feature = "sevenz")]
        assert_eq!(ArchiveFormat::from_extension("7Z"), Some(ArchiveFormat::SevenZip));
        #[cfg(feature = "zip")]
        assert_eq!(ArchiveFormat::from_extension("jar"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_extension("rar"), None);
        assert_eq!(ArchiveFormat::from_extension(""), None);
    }

    #[test]
    fn test_detect_signatures() {
        #[cfg(feature = "sevenz")]
        assert_eq!(
            ArchiveFormat::detect(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, 0, 4]),
            Some(ArchiveFormat::SevenZip)
        );
        #[cfg(feature = "zip")]
        {
            assert_eq!(ArchiveFormat::detect(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
            assert_eq!(ArchiveFormat::detect(b"PK\x05\x06"), Some(ArchiveFormat::Zip));
        }
        assert_eq!(ArchiveFormat::detect(b"7z"), None);
        assert_eq!(ArchiveFormat::detect(b""), None);
    }

    #[test]
    fn test_unknown_extension_not_supported() {
        let mut stream = Bytes::new(b"not an archive", "txt");
        let err = BuiltinEngine::new()
            .open(Source::Stream(&mut stream), &EngineOpenOptions::default())
            .err()
            .unwrap();
        assert_eq!(err.engine_code(), Some(EngineErrorCode::NotSupported));
    }

    #[test]
    fn test_detect_without_signature_falls_back_to_not_supported() {
        let mut stream = Bytes::new(b"plain text", "");
        let options = EngineOpenOptions {
            detect_type: true,
            ..Default::default()
        };
        let err = BuiltinEngine::new()
            .open(Source::Stream(&mut stream), &options)
            .err()
            .unwrap();
        assert_eq!(err.engine_code(), Some(EngineErrorCode::NotSupported));
    }

    #[test]
    fn test_copy_handles_short_writes() {
        let mut reader = io::Cursor::new(vec![7u8; 10_000]);
        let mut sink = Sink {
            accept: 333,
            ..Default::default()
        };
        let copied = copy_to_stream(&mut reader, &mut sink).unwrap();
        assert_eq!(copied, 10_000);
        assert_eq!(sink.data, vec![7u8; 10_000]);
    }

    #[test]
    fn test_type_hint_uses_forced_or_stream_extension() {
        let mut stream = Bytes::new(b"", "zip");
        assert_eq!(Source::Stream(&mut stream).type_hint().as_deref(), Some("zip"));
        let mut stream = Bytes::new(b"", "");
        assert_eq!(Source::Stream(&mut stream).type_hint(), None);
    }

    #[test]
    fn test_supported_extensions() {
        let extensions = BuiltinEngine::new().supported_extensions();
        #[cfg(feature = "sevenz")]
        assert!(extensions.contains(&"7z".to_string()));
        #[cfg(feature = "zip")]
        assert!(extensions.contains(&"zip".to_string()));
        assert!(!extensions.contains(&"rar".to_string()));
    }
}
