//! Input sources for identifier lists.
//!
//! A source string selects the transport:
//! - `--` reads standard input
//! - `http://` / `https://` fetches the body of a GET request
//! - anything else is a local file, gunzipped if it ends in `.gz` and
//!   bunzipped if it ends in `.bz2`
//!
//! Everything here is blocking; async callers should go through
//! `tokio::task::spawn_blocking`.

use anyhow::{bail, Context, Result};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

/// Marker for standard input.
pub const STDIN_MARKER: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl InputSource {
    pub fn parse(src: &str) -> Self {
        if src == STDIN_MARKER {
            InputSource::Stdin
        } else if src.starts_with("https://") || src.starts_with("http://") {
            InputSource::Url(src.to_string())
        } else {
            InputSource::File(PathBuf::from(src))
        }
    }

    /// Open the source as a line reader.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            InputSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            InputSource::Url(url) => open_url(url),
            InputSource::File(path) => open_file(path),
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "stdin"),
            InputSource::Url(url) => write!(f, "{}", url),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Compression implied by the file extension.
pub fn compression_for(path: &Path) -> Compression {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Compression::Gzip,
        Some("bz2") => Compression::Bzip2,
        _ => Compression::None,
    }
}

fn open_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input file {:?}", path))?;
    let reader: Box<dyn Read + Send> = match compression_for(path) {
        Compression::Gzip => Box::new(MultiGzDecoder::new(file)),
        Compression::Bzip2 => Box::new(MultiBzDecoder::new(file)),
        Compression::None => Box::new(file),
    };
    Ok(Box::new(BufReader::new(reader)))
}

fn open_url(url: &str) -> Result<Box<dyn BufRead + Send>> {
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch input from {}", url))?;
    if response.status() != reqwest::StatusCode::OK {
        bail!("bad response code {}", response.status().as_u16());
    }
    Ok(Box::new(BufReader::new(response)))
}

/// Open `src` and hand the reader to `f`.
pub fn read_any<T, E>(src: &str, f: impl FnOnce(Box<dyn BufRead + Send>) -> Result<T, E>) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let source = InputSource::parse(src);
    info!("Reading identifiers from {}", source);
    let reader = source.open()?;
    f(reader).with_context(|| format!("Failed to read identifiers from {}", source))
}
