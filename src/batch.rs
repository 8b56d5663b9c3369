//! Multi-document runs.
//!
//! A [`ChangeSet`] collects the documents whose formatting differs from
//! their contents on disk. Nothing is written until [`ChangeSet::apply`],
//! which stages every new file next to its original before replacing any.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::{FormatError, Result};
use crate::markup::MarkupFormatter;
use crate::process::format_document;

/// New contents for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub path: PathBuf,
    pub formatted: String,
}

/// Pending edits for a batch of documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    edits: Vec<Edit>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format `paths` one at a time.
    ///
    /// `is_cancelled` is consulted before each document; once it returns
    /// true the run stops and `Ok(None)` is returned so nothing gets applied.
    pub fn build<P, F>(
        paths: &[P],
        config: &Config,
        formatter: &dyn MarkupFormatter,
        mut is_cancelled: F,
    ) -> Result<Option<Self>>
    where
        P: AsRef<Path>,
        F: FnMut() -> bool,
    {
        let mut changes = Self::new();
        for path in paths {
            if is_cancelled() {
                tracing::debug!(pending = changes.len(), "batch run cancelled");
                return Ok(None);
            }
            let path = path.as_ref();
            let original = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let formatted = format_document(&original, config, formatter);
            changes.push_if_changed(path, &original, formatted);
        }
        Ok(Some(changes))
    }

    /// Record `formatted` for `path` unless it equals `original`
    pub fn push_if_changed(&mut self, path: &Path, original: &str, formatted: String) {
        if formatted != original {
            self.edits.push(Edit {
                path: path.to_path_buf(),
                formatted,
            });
        }
    }

    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Write every edit, returning the number of files replaced.
    ///
    /// All new contents are first written to temporary files beside their
    /// targets. If any of that fails the staged files are removed and no
    /// original is touched.
    pub fn apply(self) -> Result<usize> {
        let mut staged = Vec::with_capacity(self.edits.len());
        for edit in &self.edits {
            let file = stage(edit)
                .with_context(|| format!("failed to stage {}", edit.path.display()))?;
            staged.push((file, &edit.path));
        }

        let count = staged.len();
        for (file, path) in staged {
            file.persist(path)
                .with_context(|| format!("failed to replace {}", path.display()))?;
        }
        Ok(count)
    }
}

/// Write an edit to a temporary sibling of its target
fn stage(edit: &Edit) -> std::result::Result<NamedTempFile, FormatError> {
    let dir = edit
        .path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(edit.formatted.as_bytes())?;
    if let Ok(metadata) = fs::metadata(&edit.path) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::LineIndenter;

    #[test]
    fn test_unchanged_documents_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let clean = dir.path().join("clean.asp");
        let messy = dir.path().join("messy.asp");
        fs::write(&clean, "<p>x</p>").unwrap();
        fs::write(&messy, "<div>\n<p>x</p>\n</div>").unwrap();

        let changes = ChangeSet::build(
            &[&clean, &messy],
            &Config::default(),
            &LineIndenter,
            || false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.edits()[0].path, messy);

        assert_eq!(changes.apply().unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&messy).unwrap(),
            "<div>\n    <p>x</p>\n</div>"
        );
        assert_eq!(fs::read_to_string(&clean).unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_cancel_between_documents() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("{i}.asp"));
                fs::write(&path, "<div>\n<p>x</p>\n</div>").unwrap();
                path
            })
            .collect();

        let mut checks = 0;
        let result = ChangeSet::build(&paths, &Config::default(), &LineIndenter, || {
            checks += 1;
            checks > 2
        })
        .unwrap();
        assert!(result.is_none());
        assert_eq!(checks, 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.asp");
        let result = ChangeSet::build(&[missing], &Config::default(), &LineIndenter, || false);
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_staging_leaves_originals() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.asp");
        fs::write(&good, "old").unwrap();

        let mut changes = ChangeSet::new();
        changes.push_if_changed(&good, "old", "new".to_string());
        changes.push_if_changed(
            &dir.path().join("no-such-dir").join("page.asp"),
            "old",
            "new".to_string(),
        );
        assert!(changes.apply().is_err());
        assert_eq!(fs::read_to_string(&good).unwrap(), "old");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "staged files must be cleaned up");
    }
}
