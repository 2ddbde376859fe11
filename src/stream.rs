//! Stream callbacks for the archive engine and the channel adapter behind them.
//!
//! The engine pulls archive bytes through [`InStream`] and pushes extracted
//! bytes through [`OutStream`]. Both follow the engine's callback contract:
//! one transfer per call, short transfers allowed, `Ok(0)` meaning "nothing
//! available" and `Err` meaning failure. [`ByteChannel`] implements both over
//! a [`Channel`](crate::channel::Channel).

use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::archive_path::type_extension;
use crate::channel::{ChannelConfig, ChannelTable, FileChannel, SharedChannel};
use crate::{Error, Result};

/// Reference point for a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the start of the stream.
    Start,
    /// From the current position.
    Current,
    /// From the end of the stream.
    End,
}

impl SeekOrigin {
    /// Decodes the engine's numeric origin (0, 1 or 2).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Start),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }

    /// Builds a `SeekFrom`, rejecting negative absolute offsets.
    pub fn to_seek_from(self, offset: i64) -> io::Result<SeekFrom> {
        match self {
            Self::Start => u64::try_from(offset).map(SeekFrom::Start).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "negative seek from start")
            }),
            Self::Current => Ok(SeekFrom::Current(offset)),
            Self::End => Ok(SeekFrom::End(offset)),
        }
    }
}

/// Input stream callbacks driven by the archive engine.
pub trait InStream {
    /// Reads up to `buf.len()` bytes in one transfer.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Moves the stream position and returns the new absolute position.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64>;

    /// Total stream size.
    fn size(&mut self) -> Result<u64>;

    /// Type extension used for format selection, possibly empty.
    fn extension(&self) -> &str;
}

/// Output stream callbacks driven by the archive engine.
pub trait OutStream {
    /// Writes up to `buf.len()` bytes in one transfer.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Moves the stream position and returns the new absolute position.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64>;

    /// Pre-sizes the output.
    fn set_size(&mut self, size: u64) -> Result<()>;
}

/// Transfer direction of a [`ByteChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Archive input.
    Read,
    /// Extraction output.
    Write,
}

/// What a [`ByteChannel`] binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTarget {
    /// A filesystem path the adapter opens and owns.
    Path(PathBuf),
    /// A caller-owned channel registered in a [`ChannelTable`].
    Channel(String),
}

impl ChannelTarget {
    /// Builds a target from a name, as a channel name or a path.
    pub fn from_name(name: &str, use_channel: bool) -> Self {
        if use_channel {
            Self::Channel(name.to_string())
        } else {
            Self::Path(PathBuf::from(name))
        }
    }

    /// Display name of the target.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.to_string_lossy().into_owned(),
            Self::Channel(name) => name.clone(),
        }
    }
}

/// Adapter presenting one external handle as an engine stream.
///
/// The handle is closed on drop when the adapter opened it. A caller-owned
/// handle is only flushed and released.
pub struct ByteChannel {
    channel: Option<SharedChannel>,
    name: String,
    extension: String,
    owns_handle: bool,
    direction: Direction,
}

impl ByteChannel {
    /// Opens a channel for `target`.
    ///
    /// `force_type` overrides the extension otherwise derived from a path
    /// target's name. Caller-owned channels get no derived extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] when the target cannot be opened or
    /// resolved, when a caller-owned channel was not opened for `direction`,
    /// or when it refuses the binary non-blocking configuration.
    pub fn open(
        target: &ChannelTarget,
        table: &ChannelTable,
        direction: Direction,
        force_type: Option<&str>,
    ) -> Result<Self> {
        match target {
            ChannelTarget::Path(path) => Self::open_path(path, direction, force_type),
            ChannelTarget::Channel(name) => {
                let channel = table.get(name).ok_or_else(|| {
                    Error::channel(format!("can not find channel named \"{name}\""))
                })?;
                Self::from_shared(channel, name, direction, force_type)
            }
        }
    }

    /// Opens a file owned by the adapter.
    pub fn open_path(path: &Path, direction: Direction, force_type: Option<&str>) -> Result<Self> {
        let name = path.to_string_lossy().into_owned();
        let opened = match direction {
            Direction::Read => FileChannel::open(path).map_err(|e| {
                Error::channel_io(format!("couldn't read file \"{name}\": {e}"), e)
            })?,
            Direction::Write => FileChannel::create(path).map_err(|e| {
                Error::channel_io(format!("couldn't create file \"{name}\": {e}"), e)
            })?,
        };
        let extension = match force_type {
            Some(forced) => forced.to_string(),
            None => type_extension(&name).unwrap_or_default().to_string(),
        };
        let channel: SharedChannel = Rc::new(RefCell::new(opened));
        Self::configure(&channel, &name)?;
        log::debug!("opened {name} for {direction:?} (extension {extension:?})");
        Ok(Self {
            channel: Some(channel),
            name,
            extension,
            owns_handle: true,
            direction,
        })
    }

    /// Wraps a caller-owned channel.
    pub fn from_shared(
        channel: SharedChannel,
        name: &str,
        direction: Direction,
        force_type: Option<&str>,
    ) -> Result<Self> {
        let mode = channel.borrow().mode();
        match direction {
            Direction::Read if !mode.readable => {
                return Err(Error::channel(format!(
                    "channel \"{name}\" wasn't opened for reading"
                )));
            }
            Direction::Write if !mode.writable => {
                return Err(Error::channel(format!(
                    "channel \"{name}\" wasn't opened for writing"
                )));
            }
            _ => {}
        }
        Self::configure(&channel, name)?;
        Ok(Self {
            channel: Some(channel),
            name: name.to_string(),
            extension: force_type.unwrap_or_default().to_string(),
            owns_handle: false,
            direction,
        })
    }

    fn configure(channel: &SharedChannel, name: &str) -> Result<()> {
        channel
            .borrow_mut()
            .configure(ChannelConfig::binary_nonblocking())
            .map_err(|e| Error::channel_io(format!("couldn't configure \"{name}\": {e}"), e))
    }

    /// Logical name of the channel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the adapter closes the handle on drop.
    pub fn owns_handle(&self) -> bool {
        self.owns_handle
    }

    /// Transfer direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the handle is still held.
    pub fn is_valid(&self) -> bool {
        self.channel.is_some()
    }

    fn handle(&self) -> io::Result<&SharedChannel> {
        self.channel
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "channel released"))
    }

    /// Releases the handle, closing it if owned. Idempotent.
    pub fn close(&mut self) {
        let Some(channel) = self.channel.take() else {
            return;
        };
        let mut channel = channel.borrow_mut();
        let result = if self.owns_handle {
            channel.close()
        } else if self.direction == Direction::Write {
            channel.flush()
        } else {
            Ok(())
        };
        if let Err(e) = result {
            log::warn!("failed to release channel {}: {e}", self.name);
        }
    }

    fn seek_channel(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        let pos = origin.to_seek_from(offset)?;
        self.handle()?.borrow_mut().seek(pos)
    }
}

fn would_block_as_empty(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        other => other,
    }
}

impl InStream for ByteChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        would_block_as_empty(self.handle()?.borrow_mut().read(buf))
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.seek_channel(offset, origin)
    }

    fn size(&mut self) -> Result<u64> {
        log::error!("InStream::size called on {}", self.name);
        Err(Error::unsupported("InStream::size"))
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

impl OutStream for ByteChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        would_block_as_empty(self.handle()?.borrow_mut().write(buf))
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.seek_channel(offset, origin)
    }

    fn set_size(&mut self, _size: u64) -> Result<()> {
        log::error!("OutStream::set_size called on {}", self.name);
        Err(Error::unsupported("OutStream::set_size"))
    }
}

impl Drop for ByteChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ByteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteChannel")
            .field("name", &self.name)
            .field("extension", &self.extension)
            .field("owns_handle", &self.owns_handle)
            .field("direction", &self.direction)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// `std::io` view of an [`InStream`], for engine backends.
pub struct StreamReader<'a> {
    inner: &'a mut dyn InStream,
}

impl<'a> StreamReader<'a> {
    /// Wraps an input stream.
    pub fn new(inner: &'a mut dyn InStream) -> Self {
        Self { inner }
    }
}

impl Read for StreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for StreamReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(p) => (
                i64::try_from(p)
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek overflow"))?,
                SeekOrigin::Start,
            ),
            SeekFrom::Current(p) => (p, SeekOrigin::Current),
            SeekFrom::End(p) => (p, SeekOrigin::End),
        };
        self.inner.seek(offset, origin)
    }
}

/// `std::io` view of an [`OutStream`], for engine backends.
pub struct StreamWriter<'a> {
    inner: &'a mut dyn OutStream,
}

impl<'a> StreamWriter<'a> {
    /// Wraps an output stream.
    pub fn new(inner: &'a mut dyn OutStream) -> Self {
        Self { inner }
    }
}

impl Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
