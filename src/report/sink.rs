//! Where report artifacts are written.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Narrow filesystem capability used by the report code.
pub trait ReportSink: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Writes `payload` as the value assigned to `identifier`, replacing any
    /// previous content at `path`.
    fn write_artifact(&self, path: &Path, identifier: &str, payload: &str) -> io::Result<()>;

    /// Recursively copies `src` into `dest`, creating `dest` first.
    fn copy_tree(&self, src: &Path, dest: &Path) -> io::Result<()>;
}

/// Renders `var <identifier> = <payload>;`.
pub fn render_assignment(identifier: &str, payload: &str) -> String {
    format!("var {} = {};", identifier, payload)
}

/// Extracts the payload from content produced by [`render_assignment`].
pub fn parse_assignment<'a>(content: &'a str, identifier: &str) -> Option<&'a str> {
    content
        .strip_prefix("var ")?
        .strip_prefix(identifier)?
        .strip_prefix(" = ")?
        .strip_suffix(';')
}

/// [`ReportSink`] on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReportSink;

impl ReportSink for FsReportSink {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_artifact(&self, path: &Path, identifier: &str, payload: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, render_assignment(identifier, payload))
    }

    /// A missing `src` leaves `dest` as an empty directory.
    fn copy_tree(&self, src: &Path, dest: &Path) -> io::Result<()> {
        fs::create_dir_all(dest)?;
        if !src.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(src).min_depth(1) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| io::Error::other(e.to_string()))?;
            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }
}
