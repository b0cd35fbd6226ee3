//! Print Rendition - Fixed-Layout Conversion
//!
//! The PDF copy of a generated contract is best-effort. A converter either
//! hands back the produced file or nothing; it never fails the generation.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

pub const CONVERSION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONVERTER: &str = "libreoffice";

/// Why a print rendition was not produced. Logged, never surfaced.
#[derive(Debug, Error)]
pub enum ConversionSkipped {
    #[error("converter could not be started: {0}")]
    Spawn(#[source] io::Error),

    #[error("converter timed out after {0:?}")]
    Timeout(Duration),

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("converter finished but {0} was not produced")]
    Missing(PathBuf),
}

#[async_trait]
pub trait PrintConverter: Send + Sync {
    /// Convert `document` into `out_dir`, returning the produced file.
    async fn convert(&self, document: &Path, out_dir: &Path) -> Option<PathBuf>;
}

/// Runs `<program> [args..] --headless --convert-to pdf --outdir <dir> <document>`.
pub struct LibreOfficeConverter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LibreOfficeConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            timeout: CONVERSION_TIMEOUT,
        }
    }

    /// Parse a whitespace-separated command line such as
    /// `flatpak run org.libreoffice.LibreOffice`. None when empty.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).with_args(words))
    }

    /// Arguments placed before the conversion arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, document: &Path, out_dir: &Path) -> Result<PathBuf, ConversionSkipped> {
        // kill_on_drop reaps the child when the timeout drops the future.
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(document)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(result) => result.map_err(ConversionSkipped::Spawn)?,
            Err(_) => return Err(ConversionSkipped::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(ConversionSkipped::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stem = document.file_stem().unwrap_or_default().to_string_lossy();
        let expected = out_dir.join(format!("{stem}.pdf"));
        if expected.is_file() {
            Ok(expected)
        } else {
            Err(ConversionSkipped::Missing(expected))
        }
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

#[async_trait]
impl PrintConverter for LibreOfficeConverter {
    async fn convert(&self, document: &Path, out_dir: &Path) -> Option<PathBuf> {
        match self.run(document, out_dir).await {
            Ok(pdf) => Some(pdf),
            Err(reason) => {
                tracing::warn!(
                    document = %document.display(),
                    program = %self.program,
                    reason = %reason,
                    "print rendition skipped"
                );
                None
            }
        }
    }
}

/// Converter for deployments without an office suite.
pub struct DisabledConverter;

#[async_trait]
impl PrintConverter for DisabledConverter {
    async fn convert(&self, document: &Path, _out_dir: &Path) -> Option<PathBuf> {
        tracing::info!(document = %document.display(), "print rendition disabled");
        None
    }
}
