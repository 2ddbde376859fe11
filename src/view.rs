//! Archive views.
//!
//! An [`ArchiveView`] binds one open archive to the stream or volume set it
//! was read from. It owns both and releases them in a fixed order: the
//! archive handle first, then the backing streams.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcgate::channel::ChannelTable;
//! use arcgate::engine::{BuiltinEngine, EngineOpenOptions};
//! use arcgate::select::{ListOptions, TypeFilter};
//! use arcgate::stream::{ByteChannel, Direction};
//! use arcgate::view::{ArchiveView, Backing, ExtractTarget};
//!
//! # fn main() -> arcgate::Result<()> {
//! let stream = ByteChannel::open_path("data.7z".as_ref(), Direction::Read, None)?;
//! let mut view = ArchiveView::open(
//!     &BuiltinEngine::new(),
//!     Backing::Stream(stream),
//!     &EngineOpenOptions::default(),
//! )?;
//!
//! for entry in view.list(&ListOptions::new().type_filter(TypeFilter::Files))? {
//!     println!("{entry}");
//! }
//! view.extract("docs/readme.txt", &ExtractTarget::path("readme.txt"), &ChannelTable::new())?;
//! view.close();
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::archive_path::ItemPath;
use crate::channel::ChannelTable;
use crate::engine::{ArchiveFormat, Engine, EngineArchive, EngineOpenOptions, Source};
use crate::property::{self, Property, PropertyValue};
use crate::select::ListOptions;
use crate::stream::{ByteChannel, ChannelTarget, Direction};
use crate::volume::{VolumeCallback, VolumeSet};
use crate::{Error, Result};

/// The streams an archive is read from.
#[derive(Debug)]
pub enum Backing {
    /// A single input stream.
    Stream(ByteChannel),
    /// The volumes of a split archive.
    Volumes(VolumeSet),
}

impl Backing {
    /// Engine source over the backing streams.
    pub fn source(&mut self) -> Source<'_> {
        match self {
            Backing::Stream(stream) => Source::Stream(stream),
            Backing::Volumes(volumes) => Source::Volumes(volumes),
        }
    }

    fn name(&self) -> String {
        match self {
            Backing::Stream(stream) => stream.name().to_string(),
            Backing::Volumes(volumes) => volumes.first_volume_name().to_string(),
        }
    }
}

/// Destination of an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractTarget {
    /// Where the bytes go.
    pub destination: ChannelTarget,
    /// Password for encrypted items.
    pub password: Option<String>,
}

impl ExtractTarget {
    /// Extracts into a file, created or truncated.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: ChannelTarget::Path(path.into()),
            password: None,
        }
    }

    /// Extracts into a registered channel.
    pub fn channel(name: impl Into<String>) -> Self {
        Self {
            destination: ChannelTarget::Channel(name.into()),
            password: None,
        }
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// One listing result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    /// Normalized item path.
    Path(String),
    /// Full property record of the item.
    Record(Vec<Property>),
}

impl ListEntry {
    /// Path of the entry, if known.
    pub fn path(&self) -> Option<&str> {
        match self {
            ListEntry::Path(path) => Some(path),
            ListEntry::Record(record) => match property::find(record, property::PropertyId::Path) {
                Some(PropertyValue::Text(path)) => Some(path),
                _ => None,
            },
        }
    }
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListEntry::Path(path) => f.write_str(path),
            ListEntry::Record(record) => {
                for (i, prop) in record.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}={}", prop.name(), prop.value)?;
                }
                Ok(())
            }
        }
    }
}

/// An open archive and its backing streams.
pub struct ArchiveView {
    archive: Option<Box<dyn EngineArchive>>,
    backing: Option<Backing>,
    name: String,
}

impl ArchiveView {
    /// Opens an archive over `backing`.
    ///
    /// On failure the backing streams are released before returning.
    pub fn open(
        engine: &dyn Engine,
        mut backing: Backing,
        options: &EngineOpenOptions,
    ) -> Result<Self> {
        let name = backing.name();
        match engine.open(backing.source(), options) {
            Ok(archive) => {
                log::debug!("opened {} archive {name}", archive.format());
                Ok(Self {
                    archive: Some(archive),
                    backing: Some(backing),
                    name,
                })
            }
            Err(e) => {
                if let Error::Engine {
                    detail: Some(detail),
                    ..
                } = &e
                {
                    log::debug!("engine {} failed to open {name}: {detail}", engine.name());
                }
                Err(e)
            }
        }
    }

    /// Name of the archive target.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the view still holds an archive.
    pub fn valid(&self) -> bool {
        self.archive.is_some()
    }

    fn archive(&self) -> Result<&dyn EngineArchive> {
        self.archive.as_deref().ok_or(Error::NotOpen)
    }

    /// Container format of the archive.
    pub fn format(&self) -> Result<ArchiveFormat> {
        Ok(self.archive()?.format())
    }

    /// Archive-level properties.
    pub fn info(&self) -> Result<Vec<Property>> {
        Ok(property::enumerate(self.archive()?))
    }

    /// Number of items.
    pub fn count(&self) -> Result<u32> {
        self.archive()?.item_count()
    }

    /// Lists the items selected by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] on a closed view.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<ListEntry>> {
        let archive = self.archive()?;
        let matcher = options.matcher();
        let count = archive.item_count()?;
        let mut entries = Vec::new();
        for index in 0..count {
            let item = archive.item(index)?;
            let path = ItemPath::normalize(item.full_path());
            if !matcher.matches(path.as_str(), item.is_dir()) {
                continue;
            }
            entries.push(if options.info {
                ListEntry::Record(property::enumerate(item))
            } else {
                ListEntry::Path(path.into_string())
            });
        }
        Ok(entries)
    }

    /// Normalized paths of all items.
    pub fn item_paths(&self) -> Result<Vec<String>> {
        let archive = self.archive()?;
        (0..archive.item_count()?)
            .map(|index| {
                archive
                    .item(index)
                    .map(|item| ItemPath::normalize(item.full_path()).into_string())
            })
            .collect()
    }

    /// Extracts the file item at `source_path` to `target`.
    ///
    /// Only files are considered and the first exact path match wins.
    /// `channels` resolves channel destinations.
    ///
    /// # Errors
    ///
    /// - [`Error::ItemNotFound`] if no file has that path; the view stays
    ///   usable.
    /// - [`Error::Channel`] if the destination cannot be opened. The engine
    ///   is not invoked.
    /// - [`Error::Engine`] or [`Error::Io`] if decoding or writing fails.
    pub fn extract(
        &mut self,
        source_path: &str,
        target: &ExtractTarget,
        channels: &ChannelTable,
    ) -> Result<()> {
        let index = self.find_file(source_path)?;
        let (Some(archive), Some(backing)) = (self.archive.as_mut(), self.backing.as_mut()) else {
            return Err(Error::NotOpen);
        };

        let mut out = ByteChannel::open(&target.destination, channels, Direction::Write, None)?;
        log::debug!(
            "extracting {source_path} (item {index}) to {}",
            target.destination.name()
        );
        let result = archive.extract(
            index,
            backing.source(),
            &mut out,
            target.password.as_deref(),
        );
        out.close();
        result
    }

    fn find_file(&self, source_path: &str) -> Result<u32> {
        let archive = self.archive()?;
        for index in 0..archive.item_count()? {
            let item = archive.item(index)?;
            if item.is_dir() {
                continue;
            }
            if ItemPath::normalize(item.full_path()).as_str() == source_path {
                return Ok(index);
            }
        }
        Err(Error::item_not_found(source_path))
    }

    /// Releases the archive, then the backing streams. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut archive) = self.archive.take() {
            archive.close();
            drop(archive);
            log::debug!("closed archive {}", self.name);
        }
        match self.backing.take() {
            Some(Backing::Stream(mut stream)) => stream.close(),
            Some(Backing::Volumes(volumes)) => drop(volumes),
            None => {}
        }
    }
}

impl Drop for ArchiveView {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ArchiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveView")
            .field("name", &self.name)
            .field("valid", &self.valid())
            .field("backing", &self.backing)
            .finish()
    }
}

#[cfg(all(test, feature = "zip"))]
mod tests {
    use super::*;
    use crate::channel::{ChannelMode, MemoryChannel};
    use crate::engine::BuiltinEngine;
    use crate::property::PropertyId;
    use crate::select::TypeFilter;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::FileOptions;

    fn zip_bytes() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        writer.add_directory("docs/", options).unwrap();
        writer.start_file("docs/readme.txt", options).unwrap();
        writer.write_all(b"read me").unwrap();
        writer.start_file("Main.rs", options).unwrap();
        writer.write_all(b"fn main() {}").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn open_view(channels: &mut ChannelTable) -> ArchiveView {
        let shared = channels.register("src", MemoryChannel::from_bytes(zip_bytes()));
        let stream = ByteChannel::from_shared(shared, "src", Direction::Read, Some("zip")).unwrap();
        ArchiveView::open(
            &BuiltinEngine::new(),
            Backing::Stream(stream),
            &EngineOpenOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_list_filters() {
        let mut channels = ChannelTable::new();
        let view = open_view(&mut channels);

        let all = view.list(&ListOptions::new()).unwrap();
        assert_eq!(all.len(), 3);

        let dirs = view
            .list(&ListOptions::new().type_filter(TypeFilter::Directories))
            .unwrap();
        assert_eq!(dirs, vec![ListEntry::Path("docs/".into())]);

        let rust = view
            .list(&ListOptions::new().pattern("*.RS").nocase(true))
            .unwrap();
        assert_eq!(rust, vec![ListEntry::Path("Main.rs".into())]);

        let records = view
            .list(&ListOptions::new().pattern("docs/readme.txt").exact(true).info(true))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path(), Some("docs/readme.txt"));
    }

    #[test]
    fn test_extract_to_channel_keeps_it_open() {
        let mut channels = ChannelTable::new();
        let mut view = open_view(&mut channels);
        let sink = channels.register("sink", MemoryChannel::new(ChannelMode::WRITE));

        view.extract("docs/readme.txt", &ExtractTarget::channel("sink"), &channels)
            .unwrap();
        assert_eq!(sink.borrow().contents(), b"read me");
        assert!(!sink.borrow().is_closed());
    }

    #[test]
    fn test_extract_missing_item_keeps_view_usable() {
        let mut channels = ChannelTable::new();
        let mut view = open_view(&mut channels);

        let err = view
            .extract("docs", &ExtractTarget::channel("nowhere"), &channels)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no such item \"docs\" in the archive");
        assert_eq!(view.count().unwrap(), 3);
    }

    #[test]
    fn test_extract_to_unknown_channel_fails() {
        let mut channels = ChannelTable::new();
        let mut view = open_view(&mut channels);

        let err = view
            .extract("Main.rs", &ExtractTarget::channel("nowhere"), &channels)
            .unwrap_err();
        assert!(err.is_channel_error());
        assert_eq!(err.to_string(), "can not find channel named \"nowhere\"");
    }

    #[test]
    fn test_close_releases_in_order_and_is_idempotent() {
        let mut channels = ChannelTable::new();
        let mut view = open_view(&mut channels);
        assert!(view.valid());

        view.close();
        assert!(!view.valid());
        assert!(matches!(view.info(), Err(Error::NotOpen)));
        assert!(matches!(view.count(), Err(Error::NotOpen)));
        assert!(matches!(view.list(&ListOptions::new()), Err(Error::NotOpen)));
        view.close();
        drop(view);

        // the caller-owned source channel is still open
        let source = channels.get("src").unwrap();
        let mut buf = [0u8; 2];
        assert!(source.borrow_mut().read(&mut buf).is_ok());
    }

    #[test]
    fn test_info_reports_physical_size() {
        let mut channels = ChannelTable::new();
        let view = open_view(&mut channels);
        let info = view.info().unwrap();
        assert_eq!(
            property::find(&info, PropertyId::PhySize),
            Some(&PropertyValue::UInt(zip_bytes().len() as u64))
        );
        assert_eq!(view.format().unwrap(), ArchiveFormat::Zip);
    }
}
