//! Document sources.
//!
//! The `DocumentSource` trait lets the pipeline run against a live server
//! dump on disk, standard input, or fixtures in tests.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::document::{DecodeError, Document};

/// Error fetching a document.
#[derive(Debug)]
pub enum SourceError {
    /// Reading the underlying input failed.
    Io { source: String, error: io::Error },
    /// The input is not a valid Extended JSON document.
    Decode { source: String, error: DecodeError },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io { source, error } => write!(f, "{}: {}", source, error),
            SourceError::Decode { source, error } => write!(f, "{}: {}", source, error),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { error, .. } => Some(error),
            SourceError::Decode { error, .. } => Some(error),
        }
    }
}

/// Supplies one document per scrape.
pub trait DocumentSource {
    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;

    fn fetch(&mut self) -> Result<Document, SourceError>;
}

/// Extended JSON file on disk, re-read on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&mut self) -> Result<Document, SourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|error| SourceError::Io {
            source: self.describe(),
            error,
        })?;
        Document::from_json_str(&text).map_err(|error| SourceError::Decode {
            source: self.describe(),
            error,
        })
    }
}

/// Any reader, consumed to the end on fetch (e.g. standard input).
pub struct ReaderSource<R> {
    name: String,
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

impl<R: Read> DocumentSource for ReaderSource<R> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn fetch(&mut self) -> Result<Document, SourceError> {
        let mut text = String::new();
        self.reader
            .read_to_string(&mut text)
            .map_err(|error| SourceError::Io {
                source: self.name.clone(),
                error,
            })?;
        Document::from_json_str(&text).map_err(|error| SourceError::Decode {
            source: self.name.clone(),
            error,
        })
    }
}

/// Fixed in-memory document.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    doc: Document,
}

impl StaticSource {
    pub fn new(doc: Document) -> Self {
        Self { doc }
    }
}

impl DocumentSource for StaticSource {
    fn describe(&self) -> String {
        "static".to_string()
    }

    fn fetch(&mut self) -> Result<Document, SourceError> {
        Ok(self.doc.clone())
    }
}
