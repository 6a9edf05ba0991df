//! Ghostscript detection and invocation.
//!
//! The compressor shells out to Ghostscript when a working binary can
//! be found: a bundled copy next to the executable is preferred, then
//! a short list of well-known command names on the search path. Each
//! candidate is probed with a trivial `--version` invocation and the
//! first one that succeeds wins. When none does, the pipeline falls
//! back to a pure lopdf re-serialize.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ZepbError};

/// Command names probed on the search path, in order.
const PATH_CANDIDATES: &[&str] = &["gswin64c", "gswin32c", "gs"];

/// Binary name expected inside a bundled Ghostscript distribution.
#[cfg(windows)]
const BUNDLED_BINARY: &str = "gswin64c.exe";
#[cfg(not(windows))]
const BUNDLED_BINARY: &str = "gs";

/// Ghostscript `-dPDFSETTINGS` profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfSettings {
    /// Most aggressive: 72 dpi images, smallest output.
    Screen,
    /// High compression, 150 dpi images.
    Ebook,
    /// Balanced, 300 dpi images.
    Printer,
    /// Least aggressive, highest fidelity.
    Prepress,
}

impl PdfSettings {
    /// Map a 0-100 quality value onto a profile. The thresholds are
    /// fixed: ≤12 screen, ≤25 ebook, ≤40 printer, else prepress.
    pub fn from_quality(quality: u8) -> Self {
        if quality <= 12 {
            Self::Screen
        } else if quality <= 25 {
            Self::Ebook
        } else if quality <= 40 {
            Self::Printer
        } else {
            Self::Prepress
        }
    }

    /// The literal flag value Ghostscript expects.
    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Screen => "/screen",
            Self::Ebook => "/ebook",
            Self::Printer => "/printer",
            Self::Prepress => "/prepress",
        }
    }
}

/// Where a detected Ghostscript binary came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GhostscriptLocation {
    /// A copy bundled next to the executable.
    Bundled(PathBuf),
    /// A command name resolved through the search path.
    System(String),
}

impl GhostscriptLocation {
    /// Short origin label used in the `engine_used` summary field.
    pub fn origin(&self) -> &'static str {
        match self {
            Self::Bundled(_) => "bundled",
            Self::System(_) => "system",
        }
    }

    /// The command to invoke.
    pub fn command(&self) -> std::ffi::OsString {
        match self {
            Self::Bundled(path) => path.as_os_str().to_os_string(),
            Self::System(name) => name.into(),
        }
    }
}

impl std::fmt::Display for GhostscriptLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundled(path) => write!(f, "{}", path.display()),
            Self::System(name) => write!(f, "{name}"),
        }
    }
}

/// Ghostscript engine: detection and per-file compression.
#[derive(Debug, Clone)]
pub struct GhostscriptEngine {
    /// When false, detection always fails and the caller falls back
    /// to the pure-library path.
    enabled: bool,
}

impl GhostscriptEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create an engine that never detects a binary, forcing the
    /// pure-library fallback.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Locate a working Ghostscript binary, bundled copy first, then
    /// the search-path candidates. Returns None when nothing answers
    /// a `--version` probe.
    pub async fn detect(&self) -> Option<GhostscriptLocation> {
        if !self.enabled {
            return None;
        }

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            let bundled = dir
                .join("resources")
                .join("ghostscript")
                .join("bin")
                .join(BUNDLED_BINARY);
            if bundled.exists() && probe(bundled.as_os_str()).await {
                debug!("found bundled ghostscript at {:?}", bundled);
                return Some(GhostscriptLocation::Bundled(bundled));
            }
        }

        for candidate in PATH_CANDIDATES {
            if probe(std::ffi::OsStr::new(candidate)).await {
                debug!("found ghostscript on PATH: {candidate}");
                return Some(GhostscriptLocation::System((*candidate).to_string()));
            }
        }

        None
    }

    /// Whether detection is allowed to probe for binaries.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compress `input` into `output` with the profile derived from
    /// `quality`.
    ///
    /// The input is copied to a process-local temp file and Ghostscript
    /// writes to a second temp file which is then copied to the
    /// destination, so a crashed invocation never corrupts either end.
    /// Both temp files are removed on drop regardless of outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the subprocess cannot be spawned, exits
    /// unsuccessfully, or produces no output file.
    pub async fn compress(
        &self,
        location: &GhostscriptLocation,
        input: &Path,
        output: &Path,
        quality: u8,
    ) -> Result<()> {
        let settings = PdfSettings::from_quality(quality);

        let tmp_in = tempfile::Builder::new()
            .prefix("in-")
            .suffix(".pdf")
            .tempfile()?
            .into_temp_path();
        let tmp_out = tempfile::Builder::new()
            .prefix("out-")
            .suffix(".pdf")
            .tempfile()?
            .into_temp_path();
        let tmp_in_path: &Path = &tmp_in;
        let tmp_out_path: &Path = &tmp_out;

        tokio::fs::copy(input, tmp_in_path).await?;

        let result = Command::new(location.command())
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS={}", settings.as_flag()))
            .arg("-dNOPAUSE")
            .arg("-dBATCH")
            .arg(format!("-sOutputFile={}", tmp_out_path.display()))
            .arg(tmp_in_path)
            .output()
            .await
            .map_err(|err| ZepbError::EngineFailed {
                reason: format!("failed to run {location}: {err}"),
            })?;

        if !result.stdout.is_empty() {
            debug!("[gs stdout] {}", String::from_utf8_lossy(&result.stdout).trim());
        }
        if !result.stderr.is_empty() {
            debug!("[gs stderr] {}", String::from_utf8_lossy(&result.stderr).trim());
        }

        if !result.status.success() {
            return Err(ZepbError::EngineFailed {
                reason: format!("{location} exited with {}", result.status),
            });
        }

        let produced = tokio::fs::metadata(tmp_out_path)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(ZepbError::EngineFailed {
                reason: "Ghostscript did not create an output file".to_string(),
            });
        }

        tokio::fs::copy(tmp_out_path, output).await?;
        debug!(
            "compressed {:?} -> {:?} ({})",
            input,
            output,
            settings.as_flag()
        );

        Ok(())
    }
}

impl Default for GhostscriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Try a `--version` invocation of a candidate binary.
async fn probe(command: &std::ffi::OsStr) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}
