//! TFTP client implementation
//!
//! - `client`: Transfer state machine for get and put
//! - `session`: Per-transfer state and peer lock-on
//! - `config`: Client configuration

mod client;
mod config;
mod session;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

// Public client types
pub use client::{Client, TransferSummary};
pub use config::{ClientConfig, DEFAULT_PORT};
pub use session::{Direction, TransferSession};

use crate::tftp::core::bind_for;

/// Operation requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Operation {
    /// Download a file from the server
    Get,
    /// Upload a file to the server
    Put,
}

/// Resolve `host` to the server's request endpoint
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve host '{}'", host))?
        .collect();
    // IPv4 first
    addrs.sort_by_key(|a| !a.is_ipv4());
    addrs
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for host '{}'", host))
}

/// Run one transfer against `host`
///
/// Builds the UDP socket and the local file for the requested operation and
/// hands them to a [`Client`]. `local` defaults to `filename`.
pub fn run(
    host: &str,
    operation: Operation,
    filename: &str,
    local: Option<&Path>,
    config: ClientConfig,
) -> Result<TransferSummary> {
    let local = local.unwrap_or_else(|| Path::new(filename));
    let server = resolve(host, config.port)?;

    match operation {
        Operation::Get => {
            let socket = bind_for(server).context("Failed to bind UDP socket")?;
            let mut sink = LazyFile::new(local);

            let mut client = Client::new(socket, server, config);
            client
                .get(filename, &mut sink)
                .with_context(|| format!("Failed to download {} from {}", filename, server))
        }
        Operation::Put => {
            // Fail before any network traffic if the source is missing
            let file = File::open(local)
                .with_context(|| format!("File not found: {}", local.display()))?;
            let mut source = BufReader::new(file);
            let socket = bind_for(server).context("Failed to bind UDP socket")?;

            let mut client = Client::new(socket, server, config);
            client
                .put(&mut source, filename)
                .with_context(|| format!("Failed to upload {} to {}", filename, server))
        }
    }
}

/// Local file for a download, created when the first byte is written
///
/// An existing file is left untouched if the server refuses the request.
struct LazyFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl LazyFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
        }
    }

    fn open(&mut self) -> io::Result<&mut BufWriter<File>> {
        match self.file {
            Some(ref mut file) => Ok(file),
            ref mut slot @ None => {
                let file = File::create(&self.path).map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to create {}: {}", self.path.display(), e),
                    )
                })?;
                Ok(slot.insert(BufWriter::new(file)))
            }
        }
    }
}

impl Write for LazyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() && self.file.is_none() {
            return Ok(0);
        }
        self.open()?.write(buf)
    }

    /// Also creates the file, so an empty download still produces one
    fn flush(&mut self) -> io::Result<()> {
        self.open()?.flush()
    }
}
