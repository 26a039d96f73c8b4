//! Tile render driver.
//!
//! Captures a map view URL to an image file by driving an external
//! screenshot-capable renderer process. Render failures are per-job: the
//! scheduler records them as failed outcomes and carries on, so nothing in
//! this module aborts a capture run.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Default CSS selector hidden before capture (map attribution chrome).
pub const DEFAULT_HIDDEN_ELEMENT: &str = ".mapboxgl-control-container";

/// Default settle delay before the screenshot is taken, in seconds.
pub const DEFAULT_DELAY_SECS: f64 = 2.5;

/// Default renderer binary.
pub const DEFAULT_RENDERER_BINARY: &str = "capture-website";

/// Errors from a single capture attempt.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer process could not be launched.
    #[error("failed to launch renderer {binary:?}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The capture exceeded the per-job timeout.
    #[error("capture timed out after {0} seconds")]
    Timeout(u64),
}

/// Options controlling a capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Replace the output file if it already exists.
    pub overwrite: bool,

    /// CSS selectors of on-page chrome to hide before capturing.
    pub hide_elements: Vec<String>,

    /// Seconds to wait after page load before capturing, letting map tiles
    /// finish streaming in.
    pub delay_secs: f64,

    /// Per-capture timeout in seconds; 0 disables the timeout.
    pub timeout_secs: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            hide_elements: vec![DEFAULT_HIDDEN_ELEMENT.to_string()],
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: 0,
        }
    }
}

impl CaptureOptions {
    /// Sets the settle delay.
    pub fn with_delay_secs(mut self, delay_secs: f64) -> Self {
        self.delay_secs = delay_secs;
        self
    }

    /// Sets the per-capture timeout (0 disables it).
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Replaces the hidden-element selector list.
    pub fn with_hide_elements(mut self, selectors: Vec<String>) -> Self {
        self.hide_elements = selectors;
        self
    }
}

/// Trait for tile capture backends.
///
/// The batch scheduler treats implementors as opaque executors; mocking this
/// seam is how scheduler and session behaviour is tested without a browser.
pub trait Renderer: Send + Sync {
    /// Captures `url` to an image file at `output`.
    fn capture(
        &self,
        url: &str,
        output: &Path,
    ) -> impl Future<Output = Result<(), RenderError>> + Send;
}

/// Renderer that shells out to a screenshot-capable browser driver.
///
/// The default binary is `capture-website`; any tool accepting the same
/// flag shape (`<url> <path> --overwrite --delay=N --hide-elements=SEL`)
/// can be substituted.
pub struct WebsiteCapture {
    binary: String,
    options: CaptureOptions,
}

impl WebsiteCapture {
    /// Creates a renderer using the default binary and options.
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_RENDERER_BINARY, CaptureOptions::default())
    }

    /// Creates a renderer with a custom binary and options.
    pub fn with_binary(binary: impl Into<String>, options: CaptureOptions) -> Self {
        Self {
            binary: binary.into(),
            options,
        }
    }

    /// Command-line arguments for one capture invocation.
    fn build_args(&self, url: &str, output: &Path) -> Vec<String> {
        let mut args = vec![url.to_string(), output.display().to_string()];
        if self.options.overwrite {
            args.push("--overwrite".to_string());
        }
        args.push(format!("--delay={}", self.options.delay_secs));
        for selector in &self.options.hide_elements {
            args.push(format!("--hide-elements={}", selector));
        }
        args
    }

    async fn run(&self, url: &str, output: &Path) -> Result<(), RenderError> {
        let args = self.build_args(url, output);
        debug!(binary = %self.binary, url, output = %output.display(), "capturing tile");

        let result = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Default for WebsiteCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for WebsiteCapture {
    async fn capture(&self, url: &str, output: &Path) -> Result<(), RenderError> {
        match self.options.timeout_secs {
            0 => self.run(url, output).await,
            secs => tokio::time::timeout(Duration::from_secs(secs), self.run(url, output))
                .await
                .map_err(|_| RenderError::Timeout(secs))?,
        }
    }
}
