//! Document container handling.
//!
//! A template document is a ZIP package of XML parts plus opaque binaries
//! such as images. The archive keeps entries in their original order, parses
//! XML-family parts into [`MarkupTree`]s for substitution and writes
//! everything back out with directory entries recreated ahead of the files
//! beneath them, which is how word processors lay their packages out.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::xml::MarkupTree;

/// Content of one archive entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    /// A parsed XML part, re-serialized on write
    Markup(MarkupTree),
    /// An opaque part, written back verbatim
    Binary(Vec<u8>),
}

/// An ordered document container.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: Vec<(String, EntryContent)>,
}

impl Archive {
    /// Open a document from its byte content.
    ///
    /// Directory entries are skipped; they are reconstructed on write. Parts
    /// ending in `.xml` or `.rels` are parsed, everything else is kept as
    /// opaque bytes.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| Error::ArchiveFormat(format!("not a ZIP container: {err}")))?;
        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let path = file.name().to_string();
            let mut raw = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut raw)?;
            let content = if is_markup_path(&path) {
                EntryContent::Markup(MarkupTree::parse(&raw)?)
            } else {
                EntryContent::Binary(raw)
            };
            entries.push((path, content));
        }
        Ok(Self { entries })
    }

    /// Open a document from a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(&fs::read(path)?)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry paths in archive order.
    pub fn entry_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    /// Entries in archive order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &EntryContent)> {
        self.entries
            .iter()
            .map(|(path, content)| (path.as_str(), content))
    }

    /// Entries in archive order, contents mutable.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&str, &mut EntryContent)> {
        self.entries
            .iter_mut()
            .map(|(path, content)| (path.as_str(), content))
    }

    /// Look up an entry by its full path.
    pub fn get(&self, path: &str) -> Option<&EntryContent> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, content)| content)
    }

    /// Mutable access to an entry by its full path.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut EntryContent> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == path)
            .map(|(_, content)| content)
    }

    /// Replace an entry's content, or append a new entry at the end.
    pub fn insert(&mut self, path: impl Into<String>, content: EntryContent) {
        let path = path.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, slot)) => *slot = content,
            None => self.entries.push((path, content)),
        }
    }

    /// Write the archive back to ZIP bytes.
    ///
    /// Each directory prefix is emitted exactly once, immediately before the
    /// first file beneath it. All entries are deflated.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut written_dirs: HashSet<String> = HashSet::new();
        for (path, content) in &self.entries {
            ensure_directories(&mut writer, path, &mut written_dirs, options)?;
            writer.start_file(path.as_str(), options)?;
            match content {
                EntryContent::Markup(tree) => writer.write_all(&tree.to_bytes())?,
                EntryContent::Binary(raw) => writer.write_all(raw)?,
            }
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    /// Concatenated character data of every XML part, in archive order.
    pub fn visible_text(&self) -> String {
        let mut text = String::new();
        for (_, content) in &self.entries {
            if let EntryContent::Markup(tree) = content {
                text.push_str(&tree.visible_text());
            }
        }
        text
    }
}

fn is_markup_path(path: &str) -> bool {
    path.ends_with(".xml") || path.ends_with(".rels")
}

fn ensure_directories(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    path: &str,
    written: &mut HashSet<String>,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut prefix_end = 0;
    while let Some(slash) = path[prefix_end..].find('/') {
        prefix_end += slash + 1;
        let prefix = &path[..prefix_end];
        if written.insert(prefix.to_string()) {
            writer.add_directory(prefix, options)?;
        }
    }
    Ok(())
}
