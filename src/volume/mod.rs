//! Multi-volume archive support.
//!
//! Split archives are stored as numbered files (`archive.7z.001`,
//! `archive.7z.002`, ...). The archive engine asks for volumes by name
//! through the [`VolumeCallback`] trait; [`VolumeSet`] answers by opening
//! each volume lazily, exactly once, and keeping it open until the set is
//! dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcgate::volume::{VolumeCallback, VolumeSet};
//!
//! let mut volumes = VolumeSet::open("archive.7z.001", None);
//! assert!(volumes.move_to_volume("archive.7z.002"));
//! // revisiting an open volume does not reopen it
//! assert!(volumes.move_to_volume("archive.7z.001"));
//! assert_eq!(volumes.opened_count(), 2);
//! ```

mod reader;

pub use reader::{SplitLayout, SplitReader};

use std::path::Path;

use crate::stream::{ByteChannel, Direction, InStream};
use crate::{Error, Result};

/// Volume callbacks driven by the archive engine.
pub trait VolumeCallback {
    /// Name of the first volume, or empty if none was opened.
    fn first_volume_name(&self) -> &str;

    /// Selects the named volume, opening it on first use.
    ///
    /// Returns whether the selected volume is usable.
    fn move_to_volume(&mut self, name: &str) -> bool;

    /// Size of the current volume.
    fn current_volume_size(&mut self) -> Result<u64>;

    /// Input stream of the current volume, if it is usable.
    fn open_current_volume_stream(&mut self) -> Option<&mut dyn InStream>;
}

/// One lazily opened volume.
#[derive(Debug)]
struct Volume {
    name: String,
    /// `None` when opening failed; the failure is not retried.
    stream: Option<ByteChannel>,
}

/// The set of volumes of one split archive.
///
/// Volumes are appended in the order the engine requests them and are never
/// evicted, since the engine may go back to earlier volumes.
#[derive(Debug)]
pub struct VolumeSet {
    volumes: Vec<Volume>,
    current: Option<usize>,
    force_type: Option<String>,
    opened: usize,
    last_error: Option<Error>,
}

impl VolumeSet {
    /// Creates a set and moves to `first_name`.
    ///
    /// A failed first open leaves the set [invalid](Self::is_valid) rather
    /// than returning an error, matching how later volumes behave.
    pub fn open(first_name: &str, force_type: Option<&str>) -> Self {
        let mut set = Self {
            volumes: Vec::new(),
            current: None,
            force_type: force_type.map(str::to_string),
            opened: 0,
            last_error: None,
        };
        set.move_to_volume(first_name);
        set
    }

    /// Whether the current volume is usable.
    pub fn is_valid(&self) -> bool {
        self.current
            .and_then(|i| self.volumes.get(i))
            .is_some_and(|v| v.stream.is_some())
    }

    /// Number of open attempts made so far.
    pub fn opened_count(&self) -> usize {
        self.opened
    }

    /// Number of volumes known to the set, usable or not.
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    /// Name of the current volume.
    pub fn current_name(&self) -> Option<&str> {
        self.current
            .and_then(|i| self.volumes.get(i))
            .map(|v| v.name.as_str())
    }

    /// Takes the error of the most recent failed open.
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Forced type applied to every volume.
    pub fn force_type(&self) -> Option<&str> {
        self.force_type.as_deref()
    }

    fn open_volume(&mut self, name: &str) -> usize {
        self.opened += 1;
        let stream = match ByteChannel::open_path(
            Path::new(name),
            Direction::Read,
            self.force_type.as_deref(),
        ) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::warn!("volume {name} unavailable: {e}");
                self.last_error = Some(e);
                None
            }
        };
        self.volumes.push(Volume {
            name: name.to_string(),
            stream,
        });
        self.volumes.len() - 1
    }
}

impl VolumeCallback for VolumeSet {
    fn first_volume_name(&self) -> &str {
        self.volumes.first().map(|v| v.name.as_str()).unwrap_or("")
    }

    fn move_to_volume(&mut self, name: &str) -> bool {
        let index = match self.volumes.iter().position(|v| v.name == name) {
            Some(index) => index,
            None => self.open_volume(name),
        };
        log::debug!("switched to volume {name}");
        self.current = Some(index);
        self.volumes[index].stream.is_some()
    }

    fn current_volume_size(&mut self) -> Result<u64> {
        log::error!("VolumeCallback::current_volume_size called");
        Err(Error::unsupported("VolumeCallback::current_volume_size"))
    }

    fn open_current_volume_stream(&mut self) -> Option<&mut dyn InStream> {
        let index = self.current?;
        self.volumes[index]
            .stream
            .as_mut()
            .map(|s| s as &mut dyn InStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SeekOrigin;
    use tempfile::TempDir;

    fn write_volumes(dir: &TempDir, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                path.to_string_lossy().into_owned()
            })
            .collect()
    }

    #[test]
    fn test_first_volume_opened_on_construction() {
        let dir = TempDir::new().unwrap();
        let names = write_volumes(&dir, &["a.7z.001"]);

        let set = VolumeSet::open(&names[0], None);
        assert!(set.is_valid());
        assert_eq!(set.first_volume_name(), names[0]);
        assert_eq!(set.opened_count(), 1);
    }

    #[test]
    fn test_move_to_same_volume_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let names = write_volumes(&dir, &["a.7z.001", "a.7z.002"]);

        let mut set = VolumeSet::open(&names[0], None);
        assert!(set.move_to_volume(&names[1]));
        assert_eq!(set.opened_count(), 2);
        assert!(set.move_to_volume(&names[1]));
        assert!(set.move_to_volume(&names[0]));
        assert_eq!(set.opened_count(), 2);
        assert_eq!(set.volume_count(), 2);
        assert_eq!(set.current_name(), Some(names[0].as_str()));
    }

    #[test]
    fn test_missing_volume_is_remembered() {
        let dir = TempDir::new().unwrap();
        let names = write_volumes(&dir, &["a.7z.001"]);
        let missing = dir.path().join("a.7z.002").to_string_lossy().into_owned();

        let mut set = VolumeSet::open(&names[0], None);
        assert!(!set.move_to_volume(&missing));
        assert!(!set.is_valid());
        assert!(set.open_current_volume_stream().is_none());
        assert!(!set.move_to_volume(&missing));
        assert_eq!(set.opened_count(), 2);
    }

    #[test]
    fn test_first_volume_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("none.7z.001").to_string_lossy().into_owned();
        let mut set = VolumeSet::open(&missing, None);
        assert!(!set.is_valid());
        assert_eq!(set.first_volume_name(), missing);
        let err = set.take_error().unwrap();
        assert!(err.is_channel_error());
        assert!(err.to_string().starts_with("couldn't read file"));
        assert!(set.take_error().is_none());
    }

    #[test]
    fn test_forced_type_applies_to_every_volume() {
        let dir = TempDir::new().unwrap();
        let names = write_volumes(&dir, &["a.001", "a.002"]);

        let mut set = VolumeSet::open(&names[0], Some("7z"));
        assert_eq!(set.open_current_volume_stream().unwrap().extension(), "7z");
        set.move_to_volume(&names[1]);
        assert_eq!(set.open_current_volume_stream().unwrap().extension(), "7z");
    }

    #[test]
    fn test_current_volume_stream_reads() {
        let dir = TempDir::new().unwrap();
        let names = write_volumes(&dir, &["v.zip.001"]);
        let mut set = VolumeSet::open(&names[0], None);

        let stream = set.open_current_volume_stream().unwrap();
        assert_eq!(stream.seek(0, SeekOrigin::End).unwrap(), 9);
        assert!(set.current_volume_size().is_err());
    }
}
