//! Staging of rendered letters on disk

use super::renderer::RenderedDocument;
use crate::error::{LetterError, Result};
use crate::paths::StagingLayout;
use letter_types::{LetterKind, ReferenceKey};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A staged HTML file and the request it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub kind: LetterKind,
    pub key: ReferenceKey,
}

/// Stages the letters of one run. Each path is written at most once per
/// writer, so two keys that sanitize to the same file name are an error
/// instead of one letter replacing the other.
pub struct DocumentWriter {
    layout: StagingLayout,
    written: HashSet<PathBuf>,
}

impl DocumentWriter {
    pub fn new(layout: StagingLayout) -> Self {
        Self {
            layout,
            written: HashSet::new(),
        }
    }

    /// Write one file per printed copy, creating or truncating each.
    /// Copies share the same bytes; the document is rendered once.
    pub fn write(&mut self, document: &RenderedDocument) -> Result<Vec<StagedFile>> {
        let request = document.request();
        let paths = self.layout.staged_paths(request).ok_or_else(|| {
            LetterError::Mapping(format!(
                "reference '{}' has no characters usable in a file name",
                request.key()
            ))
        })?;

        if let Some(clash) = paths.iter().find(|path| self.written.contains(*path)) {
            return Err(LetterError::Mapping(format!(
                "reference '{}' maps to {}, already staged for another letter",
                request.key(),
                clash.display()
            )));
        }

        fs::create_dir_all(self.layout.html_dir(request.kind()))?;

        let mut staged = Vec::with_capacity(paths.len());
        for path in paths {
            write_file(&path, document.html().as_bytes())?;
            self.written.insert(path.clone());
            staged.push(StagedFile {
                path,
                kind: request.kind(),
                key: request.key().clone(),
            });
        }

        log::debug!("Staged {} file(s) for {}", staged.len(), request.key());
        Ok(staged)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| {
        LetterError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write {}: {}", path.display(), e),
        ))
    })
}
