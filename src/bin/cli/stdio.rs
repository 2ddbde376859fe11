//! Standard streams as named channels.

use std::io::{self, Read, SeekFrom, Write};

use arcgate::channel::{Channel, ChannelConfig, ChannelMode};

fn not_seekable() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "standard streams are not seekable")
}

/// Standard input, readable only.
#[derive(Default)]
pub struct StdinChannel {
    config: ChannelConfig,
}

impl Channel for StdinChannel {
    fn mode(&self) -> ChannelMode {
        ChannelMode::READ
    }

    fn config(&self) -> ChannelConfig {
        self.config
    }

    fn configure(&mut self, config: ChannelConfig) -> io::Result<()> {
        self.config = config;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "channel not opened for writing",
        ))
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(not_seekable())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Standard output, writable only.
#[derive(Default)]
pub struct StdoutChannel {
    config: ChannelConfig,
}

impl Channel for StdoutChannel {
    fn mode(&self) -> ChannelMode {
        ChannelMode::WRITE
    }

    fn config(&self) -> ChannelConfig {
        self.config
    }

    fn configure(&mut self, config: ChannelConfig) -> io::Result<()> {
        self.config = config;
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "channel not opened for reading",
        ))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().lock().write(buf)
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(not_seekable())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}
