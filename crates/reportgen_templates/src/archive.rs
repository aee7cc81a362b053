//! Document container I/O.
//!
//! A template is a zip container of named parts. Markup parts are decoded to
//! text so the renderer can rewrite them; everything else stays binary.
//! Reassembly copies untouched entries raw, so their compressed bytes are
//! preserved, and returns the original bytes verbatim when nothing changed.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};

/// Largest part accepted when opening a container.
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Content of one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    Text(String),
    Binary(Vec<u8>),
}

impl PartContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    content: PartContent,
    /// Present in the source container
    original: bool,
    modified: bool,
}

/// An opened template: ordered mapping from part name to content.
///
/// Each render owns its own document; it is never shared.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    source: Vec<u8>,
    parts: Vec<Part>,
}

impl TemplateDocument {
    /// Open a container from its bytes.
    pub fn open(bytes: impl Into<Vec<u8>>) -> ArchiveResult<Self> {
        let source = bytes.into();
        let mut archive = ZipArchive::new(Cursor::new(source.as_slice()))
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            // Declared sizes come from the container and are not trusted.
            if entry.size() > MAX_PART_BYTES {
                return Err(ArchiveError::PartTooLarge {
                    part: name,
                    limit: MAX_PART_BYTES,
                });
            }
            let mut bytes = Vec::new();
            (&mut entry)
                .take(MAX_PART_BYTES + 1)
                .read_to_end(&mut bytes)
                .map_err(|e| ArchiveError::UnreadablePart {
                    part: name.clone(),
                    message: e.to_string(),
                })?;
            if bytes.len() as u64 > MAX_PART_BYTES {
                return Err(ArchiveError::PartTooLarge {
                    part: name,
                    limit: MAX_PART_BYTES,
                });
            }

            let content = if is_markup_name(&name) {
                match String::from_utf8(bytes) {
                    Ok(text) => PartContent::Text(text),
                    Err(e) => PartContent::Binary(e.into_bytes()),
                }
            } else {
                PartContent::Binary(bytes)
            };

            parts.push(Part {
                name,
                content,
                original: true,
                modified: false,
            });
        }

        debug!("Opened container with {} part(s)", parts.len());
        Ok(Self { source, parts })
    }

    /// Open a container from a file on disk.
    pub fn from_path(path: &Path) -> ArchiveResult<Self> {
        Self::open(fs::read(path)?)
    }

    /// Part names in container order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Decoded text of a markup part. `None` for binary or absent parts.
    pub fn text(&self, name: &str) -> Option<&str> {
        match &self.part(name)?.content {
            PartContent::Text(text) => Some(text),
            PartContent::Binary(_) => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.part(name).map(|p| p.content.as_bytes())
    }

    /// Fail with [`ArchiveError::MissingPart`] unless every name is present.
    pub fn require(&self, names: &[&str]) -> ArchiveResult<()> {
        match names.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(ArchiveError::MissingPart(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Replace (or add) a markup part.
    pub fn set_text(&mut self, name: &str, text: String) {
        self.set(name, PartContent::Text(text));
    }

    /// Replace (or add) a binary part.
    pub fn insert_binary(&mut self, name: &str, bytes: Vec<u8>) {
        self.set(name, PartContent::Binary(bytes));
    }

    pub fn is_modified(&self) -> bool {
        self.parts.iter().any(|p| p.modified)
    }

    /// Repack the container.
    pub fn reassemble(&self) -> ArchiveResult<Vec<u8>> {
        if !self.is_modified() {
            return Ok(self.source.clone());
        }

        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.source.len())));
        // Fixed timestamp keeps repeated renders byte-identical.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

            match self.part(entry.name()).filter(|p| p.modified) {
                Some(part) => {
                    drop(entry);
                    write_part(&mut writer, part, options)?;
                }
                None => writer
                    .raw_copy_file(entry)
                    .map_err(|e| ArchiveError::Write(e.to_string()))?,
            }
        }

        for part in self.parts.iter().filter(|p| !p.original) {
            write_part(&mut writer, part, options)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| ArchiveError::Write(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    fn set(&mut self, name: &str, content: PartContent) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => {
                if part.content != content {
                    part.content = content;
                    part.modified = true;
                }
            }
            None => self.parts.push(Part {
                name: name.to_string(),
                content,
                original: false,
                modified: true,
            }),
        }
    }
}

fn write_part(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    part: &Part,
    options: SimpleFileOptions,
) -> ArchiveResult<()> {
    writer
        .start_file(part.name.as_str(), options)
        .map_err(|e| ArchiveError::Write(e.to_string()))?;
    writer.write_all(part.content.as_bytes())?;
    Ok(())
}

fn is_markup_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".rels")
}

/// Open a container from its bytes.
pub fn open(bytes: impl Into<Vec<u8>>) -> ArchiveResult<TemplateDocument> {
    TemplateDocument::open(bytes)
}

/// Repack a document into container bytes.
pub fn reassemble(document: &TemplateDocument) -> ArchiveResult<Vec<u8>> {
    document.reassemble()
}
