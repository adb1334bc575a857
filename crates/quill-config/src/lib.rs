//! Quill configuration system
//!
//! This crate provides centralized configuration management for Quill,
//! loading settings from `quill.toml` as an alternative to environment
//! variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Quill
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuillConfig {
    /// Glyph resolver policy settings
    pub resolver: ResolverConfig,
}

/// Glyph resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Track placeholder matches during the fallback walk and synthesize
    /// visible placeholder boxes for unresolved glyphs
    pub placeholder_substitution: bool,
    /// Route sandboxed glyph providers through a module runtime
    pub sandbox: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            placeholder_substitution: true,
            sandbox: false,
        }
    }
}

impl QuillConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the quill.toml configuration file
    ///
    /// # Returns
    /// * `Ok(QuillConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (quill.toml in the
    /// current directory) or return default configuration if the file
    /// doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("quill.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file
    /// values. This allows for temporary overrides without modifying the
    /// config file.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("QUILL_PLACEHOLDER") {
            self.resolver.placeholder_substitution =
                val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("QUILL_SANDBOX") {
            self.resolver.sandbox = val == "1" || val.eq_ignore_ascii_case("true");
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// This is the recommended way to load configuration:
    /// 1. Load from quill.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
