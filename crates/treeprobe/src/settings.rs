//! Engine settings.
//!
//! Settings are a plain value owned by a [`crate::Session`]; there is no
//! global instance. Where the values come from (a YAML or JSON file, a test
//! fixture, code) is the caller's business.

use crate::geometry::ScreenScale;
use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default timeout for element searches (10 seconds)
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 10_000;

/// Default timeout for a single probe during scroll convergence (1 second)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;

/// Default scrollbar thickness in pixels
pub const DEFAULT_SCROLL_BAR_SIZE: u32 = 18;

/// Tunables for searching and scrolling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout for `find_element` and lazy resolution
    pub search_timeout_ms: u64,
    /// Timeout for each probe of the scroll convergence
    pub probe_timeout_ms: u64,
    /// Sleep between polling attempts; 0 polls back to back
    pub poll_interval_ms: u64,
    /// Width of a vertical scrollbar
    pub scroll_bar_width: u32,
    /// Height of a horizontal scrollbar
    pub scroll_bar_height: u32,
    /// Invoke the diagnostics hook on failure paths
    pub automatic_screenshot_capture: bool,
    /// Where diagnostics hooks should write captures
    pub screenshots_path: PathBuf,
    /// Physical-to-logical pixel ratio; non-positive factors fail to load
    pub screen_scale: ScreenScale,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_timeout_ms: DEFAULT_SEARCH_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            poll_interval_ms: 0,
            scroll_bar_width: DEFAULT_SCROLL_BAR_SIZE,
            scroll_bar_height: DEFAULT_SCROLL_BAR_SIZE,
            automatic_screenshot_capture: false,
            screenshots_path: PathBuf::from("Screenshots"),
            screen_scale: ScreenScale::IDENTITY,
        }
    }
}

impl Settings {
    /// Create default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search timeout
    #[must_use]
    pub const fn with_search_timeout_ms(mut self, ms: u64) -> Self {
        self.search_timeout_ms = ms;
        self
    }

    /// Set the per-probe timeout
    #[must_use]
    pub const fn with_probe_timeout_ms(mut self, ms: u64) -> Self {
        self.probe_timeout_ms = ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set both scrollbar thicknesses
    #[must_use]
    pub const fn with_scroll_bar_size(mut self, width: u32, height: u32) -> Self {
        self.scroll_bar_width = width;
        self.scroll_bar_height = height;
        self
    }

    /// Enable or disable the diagnostics hook
    #[must_use]
    pub const fn with_automatic_screenshot_capture(mut self, enabled: bool) -> Self {
        self.automatic_screenshot_capture = enabled;
        self
    }

    /// Set the capture directory
    #[must_use]
    pub fn with_screenshots_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshots_path = path.into();
        self
    }

    /// Set the screen scale
    #[must_use]
    pub const fn with_screen_scale(mut self, scale: ScreenScale) -> Self {
        self.screen_scale = scale;
        self
    }

    /// Parse from YAML; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Parse from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> ProbeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, choosing the format by extension (`.json`, else YAML)
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let text = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    /// Write as YAML
    pub fn save(&self, path: &Path) -> ProbeResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml_ng::to_string(self)?)?;
        Ok(())
    }
}
