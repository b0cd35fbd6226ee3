//! Template Locator - Canonical Template Presence
//!
//! The pipeline always reads the template from one canonical path. At startup
//! the locator makes sure something is there, copying the first existing file
//! from an ordered list of fallback locations.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const TEMPLATE_FILENAME: &str = "contrato_base.docx";

/// Snapshot reported by the template-status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateStatus {
    pub template_exists: bool,
    pub template_path: String,
    pub template_size: u64,
}

/// Copies `source` to `dest`, carrying over what the installed template keeps.
type CopyFn = fn(&Path, &Path) -> io::Result<()>;

pub struct TemplateLocator {
    canonical: PathBuf,
    candidates: Vec<PathBuf>,
    copy: CopyFn,
}

impl TemplateLocator {
    /// Locator with the default fallback locations for [`TEMPLATE_FILENAME`].
    pub fn new(canonical: impl Into<PathBuf>) -> Self {
        Self {
            canonical: canonical.into(),
            candidates: default_candidates(),
            copy: copy_with_mtime,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn exists(&self) -> bool {
        self.canonical.is_file()
    }

    /// Make sure the canonical template exists.
    ///
    /// Returns true if it was already present or a fallback copy succeeded.
    /// A failing copy is logged and the next candidate is tried.
    pub fn ensure(&self) -> bool {
        if self.exists() {
            tracing::info!(path = %self.canonical.display(), "template found");
            return true;
        }

        tracing::warn!(
            path = %self.canonical.display(),
            "template not found, searching fallback locations"
        );

        for source in &self.candidates {
            if !source.is_file() {
                continue;
            }
            match self.install_from(source) {
                Ok(()) => {
                    tracing::info!(source = %source.display(), "template copied");
                    return true;
                }
                Err(e) => {
                    tracing::warn!(source = %source.display(), error = %e, "failed to copy template");
                }
            }
        }

        tracing::error!(
            expected = %self.canonical.display(),
            searched = ?self.candidates,
            "template missing; place {} in one of the searched locations",
            TEMPLATE_FILENAME
        );
        false
    }

    pub fn status(&self) -> TemplateStatus {
        let size = fs::metadata(&self.canonical)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());
        TemplateStatus {
            template_exists: size.is_some(),
            template_path: self.canonical.display().to_string(),
            template_size: size.unwrap_or(0),
        }
    }

    /// Copy `source` next to the canonical path under a unique name, carry over
    /// its modification time, then rename into place. Concurrent installers
    /// never observe a half-written template.
    fn install_from(&self, source: &Path) -> io::Result<()> {
        if let Some(parent) = self.canonical.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let staging = self.canonical.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        let result = (self.copy)(source, &staging)
            .and_then(|()| fs::rename(&staging, &self.canonical));
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result
    }
}

/// `fs::copy` keeps permissions; the modification time is restored explicitly.
fn copy_with_mtime(source: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(source, dest)?;
    let modified = fs::metadata(source)?.modified()?;
    File::options().write(true).open(dest)?.set_modified(modified)?;
    Ok(())
}

/// Fallback locations, in search order.
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Downloads").join(TEMPLATE_FILENAME));
        candidates.push(home.join("downloads").join(TEMPLATE_FILENAME));
    }
    candidates.push(Path::new(".").join(TEMPLATE_FILENAME));
    candidates.push(Path::new("..").join(TEMPLATE_FILENAME));
    candidates
}
