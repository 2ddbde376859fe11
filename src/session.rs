//! Library facade and session registry.
//!
//! [`Library`] owns the engine, the table of caller-owned channels and the
//! open sessions. Each successful [`Library::open`] registers an
//! [`ArchiveView`] under a fresh identifier (`sevenzip0`, `sevenzip1`, ...).
//! Identifiers are never reused within one library.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcgate::{ExtractTarget, Library, ListOptions, OpenOptions};
//!
//! # fn main() -> arcgate::Result<()> {
//! let mut library = Library::new();
//! let id = library.open(&OpenOptions::path("backup.7z.001").multivolume(true))?;
//!
//! let count = library.session(&id)?.count()?;
//! println!("{id}: {count} items");
//! library.extract(&id, "notes.txt", &ExtractTarget::path("notes.txt"))?;
//! library.close(&id)?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use crate::channel::ChannelTable;
use crate::engine::{BuiltinEngine, Engine, EngineOpenOptions};
use crate::stream::{ByteChannel, ChannelTarget, Direction};
use crate::view::{ArchiveView, Backing, ExtractTarget};
use crate::volume::VolumeSet;
use crate::{Error, Result};

/// Prefix of session identifiers.
pub const SESSION_PREFIX: &str = "sevenzip";

/// How to open an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// File path, or channel name when `use_channel` is set.
    pub target: String,
    /// Resolve `target` in the channel table.
    pub use_channel: bool,
    /// Treat `target` as the first volume of a split archive.
    pub multivolume: bool,
    /// Pick the format from the archive signature.
    pub detect_type: bool,
    /// Type extension overriding the one derived from `target`.
    pub force_type: Option<String>,
    /// Password for encrypted archives.
    pub password: Option<String>,
}

impl OpenOptions {
    /// Opens the file at `path`.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            target: path.into(),
            ..Self::default()
        }
    }

    /// Opens the registered channel `name`.
    pub fn channel(name: impl Into<String>) -> Self {
        Self {
            target: name.into(),
            use_channel: true,
            ..Self::default()
        }
    }

    /// Treats the target as the first volume of a split archive.
    pub fn multivolume(mut self, multivolume: bool) -> Self {
        self.multivolume = multivolume;
        self
    }

    /// Enables signature detection.
    pub fn detect_type(mut self, detect: bool) -> Self {
        self.detect_type = detect;
        self
    }

    /// Forces the archive type.
    pub fn force_type(mut self, extension: impl Into<String>) -> Self {
        self.force_type = Some(extension.into());
        self
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Rejects conflicting options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if both `detect_type` and `force_type`
    /// are set, or both `multivolume` and `use_channel`.
    pub fn validate(&self) -> Result<()> {
        if self.detect_type && self.force_type.is_some() {
            return Err(Error::validation(
                "only one of options \"-detecttype\" or \"-forcetype\" must be specified",
            ));
        }
        if self.multivolume && self.use_channel {
            return Err(Error::validation(
                "only one of options \"-multivolume\" or \"-channel\" must be specified",
            ));
        }
        Ok(())
    }

    /// The target as a channel target.
    pub fn channel_target(&self) -> ChannelTarget {
        ChannelTarget::from_name(&self.target, self.use_channel)
    }

    fn engine_options(&self) -> EngineOpenOptions {
        EngineOpenOptions {
            password: self.password.clone(),
            detect_type: self.detect_type,
        }
    }
}

/// Open sessions keyed by identifier.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next: u64,
    sessions: BTreeMap<String, ArchiveView>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `view` and returns its identifier.
    pub fn insert(&mut self, view: ArchiveView) -> String {
        let id = format!("{SESSION_PREFIX}{}", self.next);
        self.next += 1;
        self.sessions.insert(id.clone(), view);
        id
    }

    /// Looks up a session.
    pub fn get(&self, id: &str) -> Result<&ArchiveView> {
        self.sessions.get(id).ok_or_else(|| unknown_session(id))
    }

    /// Looks up a session for mutation.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut ArchiveView> {
        self.sessions.get_mut(id).ok_or_else(|| unknown_session(id))
    }

    /// Removes a session without closing it.
    pub fn remove(&mut self, id: &str) -> Option<ArchiveView> {
        self.sessions.remove(id)
    }

    /// Whether `id` names an open session.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn unknown_session(id: &str) -> Error {
    Error::validation(format!("invalid command name \"{id}\""))
}

/// Entry point: engine, channels and sessions.
pub struct Library {
    engine: Box<dyn Engine>,
    channels: ChannelTable,
    sessions: SessionRegistry,
}

impl Library {
    /// Creates a library over the builtin engine.
    pub fn new() -> Self {
        Self::with_engine(Box::new(BuiltinEngine::new()))
    }

    /// Creates a library over a custom engine.
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            channels: ChannelTable::new(),
            sessions: SessionRegistry::new(),
        }
    }

    /// The engine.
    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Caller-owned channels.
    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Caller-owned channels, for registration.
    pub fn channels_mut(&mut self) -> &mut ChannelTable {
        &mut self.channels
    }

    /// Open sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Type extensions the engine can open.
    pub fn supported_extensions(&self) -> Vec<String> {
        self.engine.supported_extensions()
    }

    /// Opens an archive and returns the view without registering it.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for conflicting options, before any I/O.
    /// - [`Error::Channel`] if the target cannot be opened.
    /// - [`Error::Engine`] if the engine rejects the archive.
    pub fn open_view(&self, options: &OpenOptions) -> Result<ArchiveView> {
        options.validate()?;
        let force_type = options.force_type.as_deref();
        let backing = if options.multivolume {
            let mut volumes = VolumeSet::open(&options.target, force_type);
            if !volumes.is_valid() {
                return Err(volumes.take_error().unwrap_or_else(|| {
                    Error::channel(format!("couldn't read file \"{}\"", options.target))
                }));
            }
            Backing::Volumes(volumes)
        } else {
            Backing::Stream(ByteChannel::open(
                &options.channel_target(),
                &self.channels,
                Direction::Read,
                force_type,
            )?)
        };
        ArchiveView::open(self.engine.as_ref(), backing, &options.engine_options())
    }

    /// Opens an archive and registers a session for it.
    pub fn open(&mut self, options: &OpenOptions) -> Result<String> {
        let view = self.open_view(options)?;
        let id = self.sessions.insert(view);
        log::debug!("session {id} opened for {}", options.target);
        Ok(id)
    }

    /// Looks up a session.
    pub fn session(&self, id: &str) -> Result<&ArchiveView> {
        self.sessions.get(id)
    }

    /// Looks up a session for mutation.
    pub fn session_mut(&mut self, id: &str) -> Result<&mut ArchiveView> {
        self.sessions.get_mut(id)
    }

    /// Extracts one item of a session, resolving channel destinations in
    /// this library's channel table.
    pub fn extract(&mut self, id: &str, source_path: &str, target: &ExtractTarget) -> Result<()> {
        let view = self.sessions.get_mut(id)?;
        view.extract(source_path, target, &self.channels)
    }

    /// Closes and removes a session.
    pub fn close(&mut self, id: &str) -> Result<()> {
        let mut view = self.sessions.remove(id).ok_or_else(|| unknown_session(id))?;
        view.close();
        log::debug!("session {id} closed");
        Ok(())
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("engine", &self.engine.name())
            .field("channels", &self.channels)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
