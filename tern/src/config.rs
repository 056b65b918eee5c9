//! Run configuration
//!
//! Settings come from defaults, then an optional `tern.toml`, then CLI flags:
//!
//! ```toml
//! [run]
//! module = "main"
//! max_frames = 64
//! trace_calls = false
//! ```

use crate::error::{CompileError, Result};
use serde::Deserialize;
use std::path::Path;

/// Default depth of the frame stack
pub const DEFAULT_MAX_FRAMES: usize = 64;

/// Default file looked up next to the script
pub const CONFIG_FILE: &str = "tern.toml";

/// Interpreter settings
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Module name shown in stack frames
    pub module: String,
    /// Deepest call stack allowed before `Stack overflow.`
    pub max_frames: usize,
    /// Log every call entry and exit to stderr
    pub trace_calls: bool,
}

/// On-disk layout; every key is optional and overrides what is already set
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    run: RunSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunSection {
    module: Option<String>,
    max_frames: Option<usize>,
    trace_calls: Option<bool>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            module: "main".to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            trace_calls: false,
        }
    }
}

impl RunConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the module name
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Set the frame stack limit
    pub fn max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Enable call tracing
    pub fn trace_calls(mut self, trace_calls: bool) -> Self {
        self.trace_calls = trace_calls;
        self
    }

    /// Parse a config file on top of the defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Self::default().merge_toml(source)
    }

    /// Apply the keys present in a config file's `[run]` table
    pub fn merge_toml(mut self, source: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(source).map_err(|e| CompileError::config_error(e.to_string()))?;
        let run = file.run;
        if let Some(module) = run.module {
            self.module = module;
        }
        if let Some(max_frames) = run.max_frames {
            self.max_frames = max_frames;
        }
        if let Some(trace_calls) = run.trace_calls {
            self.trace_calls = trace_calls;
        }
        self.validate()
    }

    /// Read a config file and apply it
    pub fn merge_file(self, path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            CompileError::io_error(format!("cannot read {}: {e}", path.display()))
        })?;
        self.merge_toml(&source)
    }

    /// Module name derived from a script path: its file stem
    pub fn module_for(path: &Path) -> Option<String> {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    /// Reject settings the interpreter cannot run with
    pub fn validate(self) -> Result<Self> {
        if self.max_frames == 0 {
            return Err(CompileError::config_error("max_frames must be at least 1"));
        }
        if self.module.is_empty() {
            return Err(CompileError::config_error("module must not be empty"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.module, "main");
        assert_eq!(config.max_frames, 64);
        assert!(!config.trace_calls);
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new().module("lib").max_frames(8).trace_calls(true);
        assert_eq!(config.module, "lib");
        assert_eq!(config.max_frames, 8);
        assert!(config.trace_calls);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RunConfig::from_toml_str("[run]\nmax_frames = 10\n").unwrap();
        assert_eq!(config.max_frames, 10);
        assert_eq!(config.module, "main");
    }

    #[test]
    fn test_from_toml_empty() {
        assert_eq!(RunConfig::from_toml_str("").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_from_toml_unknown_key() {
        let err = RunConfig::from_toml_str("[run]\nfast = true\n").unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn test_zero_frames_rejected() {
        let err = RunConfig::from_toml_str("[run]\nmax_frames = 0\n").unwrap_err();
        assert!(err.message().contains("max_frames"));
    }

    #[test]
    fn test_module_for_path() {
        assert_eq!(
            RunConfig::module_for(Path::new("scripts/iterators.tn")).as_deref(),
            Some("iterators")
        );
    }

    #[test]
    fn test_merge_keeps_unset_keys() {
        let config = RunConfig::new()
            .module("iterators")
            .merge_toml("[run]\ntrace_calls = true\n")
            .unwrap();
        assert_eq!(config.module, "iterators");
        assert!(config.trace_calls);
    }

    #[test]
    fn test_merge_missing_file() {
        let err = RunConfig::new()
            .merge_file(Path::new("/nonexistent/tern.toml"))
            .unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }
}
