//! Reading a split archive as one logical stream.

use std::io::{self, Read, Seek, SeekFrom};

use crate::archive_path::next_volume_name;
use crate::stream::SeekOrigin;
use crate::volume::VolumeCallback;
use crate::{EngineErrorCode, Error, Result};

/// Names and sizes of the volumes of a split archive.
///
/// Built by walking volume names from the first volume until the callback
/// reports a volume as unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLayout {
    names: Vec<String>,
    sizes: Vec<u64>,
    total_size: u64,
}

impl SplitLayout {
    /// Discovers the volumes reachable from the first volume.
    ///
    /// Sizes are measured by seeking each volume stream to its end. The
    /// callback is left positioned on the first volume.
    ///
    /// # Errors
    ///
    /// Returns [`EngineErrorCode::Unknown`] if the first volume is unusable,
    /// or an I/O error if a volume cannot be measured.
    pub fn probe(volumes: &mut dyn VolumeCallback) -> Result<Self> {
        let first = volumes.first_volume_name().to_string();
        let mut names = Vec::new();
        let mut sizes = Vec::new();
        let mut name = Some(first.clone());

        while let Some(current) = name {
            if !volumes.move_to_volume(&current) {
                break;
            }
            let Some(stream) = volumes.open_current_volume_stream() else {
                break;
            };
            let size = stream.seek(0, SeekOrigin::End)?;
            stream.seek(0, SeekOrigin::Start)?;
            name = next_volume_name(&current);
            names.push(current);
            sizes.push(size);
        }

        if names.is_empty() {
            return Err(Error::engine_detail(
                EngineErrorCode::Unknown,
                format!("first volume {first:?} is not readable"),
            ));
        }
        volumes.move_to_volume(&first);
        let total_size = sizes.iter().sum();
        log::debug!(
            "split archive {first}: {} volumes, {total_size} bytes",
            names.len()
        );
        Ok(Self {
            names,
            sizes,
            total_size,
        })
    }

    /// Number of volumes.
    pub fn volume_count(&self) -> usize {
        self.names.len()
    }

    /// Volume names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Volume sizes in order.
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Total logical size across all volumes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Calculates volume index and offset for a logical position.
    fn position_to_volume(&self, pos: u64) -> (usize, u64) {
        let mut remaining = pos;
        for (i, &size) in self.sizes.iter().enumerate() {
            if remaining < size {
                return (i, remaining);
            }
            remaining -= size;
        }
        // Position is at or beyond end
        let last = self.sizes.len().saturating_sub(1);
        (last, self.sizes.get(last).copied().unwrap_or(0))
    }
}

/// A reader that reads across the volumes of a [`SplitLayout`].
///
/// Volumes are selected through the callback by name before every transfer,
/// so the callback decides when files are opened.
pub struct SplitReader<'a> {
    volumes: &'a mut dyn VolumeCallback,
    layout: &'a SplitLayout,
    /// Current position in the logical stream.
    position: u64,
    /// Current volume index.
    current_volume: usize,
    /// Position within the current volume.
    volume_position: u64,
}

impl<'a> SplitReader<'a> {
    /// Creates a reader positioned at the start of the first volume.
    pub fn new(volumes: &'a mut dyn VolumeCallback, layout: &'a SplitLayout) -> Self {
        Self {
            volumes,
            layout,
            position: 0,
            current_volume: 0,
            volume_position: 0,
        }
    }

    /// Current volume index (0-based).
    pub fn current_volume(&self) -> usize {
        self.current_volume
    }
}

impl Read for SplitReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total = self.layout.total_size;
        let mut filled = 0;

        while filled < buf.len() && self.position < total {
            let volume_size = self.layout.sizes[self.current_volume];
            let remaining_in_volume = volume_size - self.volume_position;

            if remaining_in_volume == 0 {
                if self.current_volume + 1 >= self.layout.sizes.len() {
                    break;
                }
                self.current_volume += 1;
                self.volume_position = 0;
                continue;
            }

            let want = (buf.len() - filled).min(remaining_in_volume as usize);
            let name = &self.layout.names[self.current_volume];
            if !self.volumes.move_to_volume(name) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("volume {name} is not available"),
                ));
            }
            let stream = self.volumes.open_current_volume_stream().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("volume {name} has no stream"))
            })?;
            let offset = i64::try_from(self.volume_position)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "volume offset overflow"))?;
            stream.seek(offset, SeekOrigin::Start)?;

            let n = stream.read(&mut buf[filled..filled + want])?;
            if n == 0 {
                // Volume shorter than measured, or a stalled channel
                break;
            }

            filled += n;
            self.position += n as u64;
            self.volume_position += n as u64;
        }

        Ok(filled)
    }
}

impl Seek for SplitReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let total = self.layout.total_size as i64;
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(p) => total + p,
            SeekFrom::Current(p) => self.position as i64 + p,
        };

        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot seek before start of stream",
            ));
        }

        self.position = (new_pos as u64).min(self.layout.total_size);

        let (vol_idx, vol_pos) = self.layout.position_to_volume(self.position);
        self.current_volume = vol_idx;
        self.volume_position = vol_pos;

        Ok(self.position)
    }
}

impl std::fmt::Debug for SplitReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitReader")
            .field("volume_count", &self.layout.volume_count())
            .field("total_size", &self.layout.total_size)
            .field("position", &self.position)
            .field("current_volume", &self.current_volume)
            .finish()
    }
}
