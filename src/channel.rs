//! External I/O handles.
//!
//! A [`Channel`] is the handle a [`ByteChannel`](crate::stream::ByteChannel)
//! wraps: a file opened by the adapter itself, or a handle the caller opened
//! earlier and registered by name in a [`ChannelTable`]. Caller-owned
//! handles are shared as [`SharedChannel`] so the caller keeps access after
//! the adapter is gone.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

/// Directions a channel was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMode {
    /// The channel accepts reads.
    pub readable: bool,
    /// The channel accepts writes.
    pub writable: bool,
}

impl ChannelMode {
    /// Read-only mode.
    pub const READ: Self = Self {
        readable: true,
        writable: false,
    };
    /// Write-only mode.
    pub const WRITE: Self = Self {
        readable: false,
        writable: true,
    };
    /// Read-write mode.
    pub const READ_WRITE: Self = Self {
        readable: true,
        writable: true,
    };
}

/// Byte translation applied by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Translation {
    /// Platform line-ending translation.
    #[default]
    Auto,
    /// Bytes pass through unchanged.
    Binary,
}

/// Transfer configuration of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Byte translation.
    pub translation: Translation,
    /// Whether transfers may block.
    pub blocking: bool,
    /// Whether the channel buffers output.
    pub buffered: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            translation: Translation::Auto,
            blocking: true,
            buffered: true,
        }
    }
}

impl ChannelConfig {
    /// Binary, non-blocking and unbuffered: what archive engines need.
    pub const fn binary_nonblocking() -> Self {
        Self {
            translation: Translation::Binary,
            blocking: false,
            buffered: false,
        }
    }
}

/// An external I/O handle.
///
/// `read` and `write` perform one transfer and may be short. A non-blocking
/// channel with nothing to transfer reports [`io::ErrorKind::WouldBlock`].
pub trait Channel {
    /// Directions the channel was opened for.
    fn mode(&self) -> ChannelMode;

    /// Current transfer configuration.
    fn config(&self) -> ChannelConfig;

    /// Replaces the transfer configuration.
    fn configure(&mut self, config: ChannelConfig) -> io::Result<()>;

    /// Reads up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes up to `buf.len()` bytes.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Moves the channel position.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Flushes buffered output.
    fn flush(&mut self) -> io::Result<()>;

    /// Releases the handle. Further transfers fail.
    fn close(&mut self) -> io::Result<()>;
}

/// A channel shared between the caller and an adapter.
pub type SharedChannel = Rc<RefCell<dyn Channel>>;

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "channel is closed")
}

/// A channel over a file on disk.
#[derive(Debug)]
pub struct FileChannel {
    file: Option<File>,
    mode: ChannelMode,
    config: ChannelConfig,
}

impl FileChannel {
    /// Wraps an already opened file.
    pub fn new(file: File, mode: ChannelMode) -> Self {
        Self {
            file: Some(file),
            mode,
            config: ChannelConfig::default(),
        }
    }

    /// Opens `path` for reading.
    pub fn open(path: impl AsRef<std::path::Path>) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?, ChannelMode::READ))
    }

    /// Creates or truncates `path` for writing.
    pub fn create(path: impl AsRef<std::path::Path>) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?, ChannelMode::WRITE))
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(closed_error)
    }
}

impl Channel for FileChannel {
    fn mode(&self) -> ChannelMode {
        self.mode
    }

    fn config(&self) -> ChannelConfig {
        self.config
    }

    fn configure(&mut self, config: ChannelConfig) -> io::Result<()> {
        // files never block and are written through directly
        self.config = config;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.mode.readable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "channel not opened for reading",
            ));
        }
        self.file()?.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.mode.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "channel not opened for writing",
            ));
        }
        self.file()?.write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file()?.seek(pos)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) if self.mode.writable => file.flush(),
            _ => Ok(()),
        }
    }
}

/// An in-memory channel.
///
/// Useful as a caller-owned extraction sink or as an archive source that
/// never touches the filesystem.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    data: Cursor<Vec<u8>>,
    mode: ChannelMode,
    config: ChannelConfig,
    closed: bool,
}

impl MemoryChannel {
    /// Creates an empty channel with the given mode.
    pub fn new(mode: ChannelMode) -> Self {
        Self {
            data: Cursor::new(Vec::new()),
            mode,
            config: ChannelConfig::default(),
            closed: false,
        }
    }

    /// Creates a readable channel over `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(bytes),
            mode: ChannelMode::READ,
            config: ChannelConfig::default(),
            closed: false,
        }
    }

    /// Returns everything written so far.
    pub fn contents(&self) -> &[u8] {
        self.data.get_ref()
    }

    /// Consumes the channel and returns its bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }

    /// Whether [`Channel::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(closed_error())
        } else {
            Ok(())
        }
    }
}

impl Channel for MemoryChannel {
    fn mode(&self) -> ChannelMode {
        self.mode
    }

    fn config(&self) -> ChannelConfig {
        self.config
    }

    fn configure(&mut self, config: ChannelConfig) -> io::Result<()> {
        self.check_open()?;
        self.config = config;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;
        self.data.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        self.data.write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        self.data.seek(pos)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Named caller-owned channels.
///
/// Archive targets and extraction destinations given with `-channel` are
/// resolved here. Registered channels are never closed by the adapters that
/// use them.
#[derive(Default)]
pub struct ChannelTable {
    channels: HashMap<String, SharedChannel>,
}

impl ChannelTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `channel` under `name`, replacing any previous entry.
    pub fn register<C: Channel + 'static>(
        &mut self,
        name: impl Into<String>,
        channel: C,
    ) -> Rc<RefCell<C>> {
        let shared = Rc::new(RefCell::new(channel));
        self.channels.insert(name.into(), shared.clone());
        shared
    }

    /// Registers an already shared channel under `name`.
    pub fn insert(&mut self, name: impl Into<String>, channel: SharedChannel) {
        self.channels.insert(name.into(), channel);
    }

    /// Looks up a channel by name.
    pub fn get(&self, name: &str) -> Option<SharedChannel> {
        self.channels.get(name).cloned()
    }

    /// Removes a channel from the table.
    pub fn unregister(&mut self, name: &str) -> Option<SharedChannel> {
        self.channels.remove(name)
    }

    /// Returns `true` if a channel is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Registered channel names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ChannelTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTable")
            .field("channels", &self.names())
            .finish()
    }
}
