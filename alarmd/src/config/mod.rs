//! Service configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! max_message_bytes: 63
//! debug_dump: false
//! prompt: "Alarm > "
//! ```
//!
//! Every key is optional.  Command-line flags are applied on top with
//! [`ServiceConfig::apply_overrides`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::intake::DEFAULT_MAX_MESSAGE_BYTES;

/// Prompt printed before each request line.
pub const DEFAULT_PROMPT: &str = "Alarm > ";

// ── Private YAML deserialization types ────────────────────────────────────────

/// Fields as they appear in the YAML file.
///
/// Kept private – callers work with [`ServiceConfig`] instead.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfigFile {
    max_message_bytes: Option<usize>,
    debug_dump: Option<bool>,
    prompt: Option<String>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Runtime configuration of the alarm service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Longest accepted alarm message, in bytes.
    pub max_message_bytes: usize,
    /// Log the pending queue after every insert.
    pub debug_dump: bool,
    /// Interactive prompt.  Empty disables it.
    pub prompt: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            debug_dump: false,
            prompt: String::from(DEFAULT_PROMPT),
        }
    }
}

/// Values supplied on the command line.  `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_message_bytes: Option<usize>,
    pub debug_dump: bool,
    pub no_prompt: bool,
}

impl ServiceConfig {
    /// Parses `path`, falling back to defaults for absent keys.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is invalid, or
    /// the resulting configuration fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading service configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        // An empty document deserialises to `()`, not a map.
        let file: ServiceConfigFile = if content.trim().is_empty() {
            ServiceConfigFile::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        let defaults = Self::default();
        let config = Self {
            max_message_bytes: file.max_message_bytes.unwrap_or(defaults.max_message_bytes),
            debug_dump: file.debug_dump.unwrap_or(defaults.debug_dump),
            prompt: file.prompt.unwrap_or(defaults.prompt),
        };
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(?config, "service configuration loaded");
        Ok(config)
    }

    /// Applies command-line overrides and re-validates.
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(max) = overrides.max_message_bytes {
            self.max_message_bytes = max;
        }
        if overrides.debug_dump {
            self.debug_dump = true;
        }
        if overrides.no_prompt {
            self.prompt.clear();
        }
        self.validate()?;
        Ok(self)
    }

    /// Rejects configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_bytes == 0 {
            bail!("max_message_bytes must be at least 1");
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
