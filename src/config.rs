//! Configuration management for aspfmt.
//!
//! This module provides the [`Config`] struct which controls all formatting behavior.
//! Configuration can be loaded from:
//! - TOML files (`aspfmt.toml`)
//! - CLI arguments (which override file settings)
//! - In-file directives (`<%-- aspfmt: --vbscript-indent 2 --%>`)
//!
//! Config files are auto-discovered by searching parent directories from the file
//! being formatted up to the filesystem root, plus the user's home directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::ScriptOptions;
use crate::markup::{MarkupOptions, WRAP_ATTRIBUTE_MODES};

/// Config file names to search for (in order of priority, later overrides earlier)
const CONFIG_FILE_NAMES: &[&str] = &["aspfmt.toml"];

/// Get the user's home directory
fn dirs_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Ok(userprofile) = std::env::var("USERPROFILE") {
        return Some(PathBuf::from(userprofile));
    }
    None
}

// Serde default functions
fn default_true() -> bool {
    true
}
fn default_vbscript_indent() -> usize {
    4
}
fn default_jscript_indent() -> usize {
    2
}
fn default_max_line_length() -> usize {
    120
}

/// Main configuration struct for aspfmt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Keep `<%-- --%>` comment blocks verbatim (default: true)
    #[serde(default = "default_true")]
    pub preserve_asp_comments: bool,

    /// Keep `<!-- #include -->` directives verbatim (default: true)
    #[serde(default = "default_true")]
    pub preserve_include_directives: bool,

    /// Pick each block's language with the heuristic classifier (default: false)
    #[serde(default)]
    pub detect_asp_language: bool,

    /// Beautify VBScript in server blocks (default: true)
    #[serde(default = "default_true")]
    pub format_vbscript_in_blocks: bool,

    /// Beautify JScript in server blocks (default: false)
    #[serde(default)]
    pub format_jscript_in_blocks: bool,

    /// Spaces per VBScript indent level (default: 4)
    #[serde(default = "default_vbscript_indent")]
    pub vbscript_indent_size: usize,

    /// Spaces per JScript indent level (default: 2)
    #[serde(default = "default_jscript_indent")]
    pub jscript_indent_size: usize,

    /// Align `=` of VBScript assignments (default: false)
    #[serde(default)]
    pub vbscript_align_assignments: bool,

    /// Align `=` of JScript assignments (default: false)
    #[serde(default)]
    pub jscript_align_assignments: bool,

    /// Append missing `;` to JScript statements (default: true)
    #[serde(default = "default_true")]
    pub jscript_semicolons: bool,

    /// Break script lines longer than this; 0 disables breaking (default: 120)
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Re-indent multi-line blocks to their position in the markup (default: true)
    #[serde(default = "default_true")]
    pub align_server_blocks: bool,

    /// Strip trailing whitespace from every output line (default: true)
    #[serde(default = "default_true")]
    pub trim_trailing_whitespace: bool,

    /// Options handed to the markup formatter
    #[serde(default)]
    pub markup: MarkupOptions,
}

/// Partial `[markup]` table
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialMarkup {
    pub indent_size: Option<usize>,
    pub indent_with_tabs: Option<bool>,
    pub wrap_line_length: Option<usize>,
    pub preserve_newlines: Option<bool>,
    pub max_preserve_newlines: Option<usize>,
    pub wrap_attributes: Option<String>,
    pub end_with_newline: Option<bool>,
}

/// Partial configuration for TOML parsing
///
/// All fields are `Option<T>` so we can distinguish between
/// "explicitly set" and "not specified" when merging configs.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    pub preserve_asp_comments: Option<bool>,
    pub preserve_include_directives: Option<bool>,
    pub detect_asp_language: Option<bool>,
    pub format_vbscript_in_blocks: Option<bool>,
    pub format_jscript_in_blocks: Option<bool>,
    pub vbscript_indent_size: Option<usize>,
    pub jscript_indent_size: Option<usize>,
    pub vbscript_align_assignments: Option<bool>,
    pub jscript_align_assignments: Option<bool>,
    pub jscript_semicolons: Option<bool>,
    pub max_line_length: Option<usize>,
    pub align_server_blocks: Option<bool>,
    pub trim_trailing_whitespace: Option<bool>,
    #[serde(default)]
    pub markup: PartialMarkup,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            preserve_asp_comments: true,
            preserve_include_directives: true,
            detect_asp_language: false,
            format_vbscript_in_blocks: true,
            format_jscript_in_blocks: false,
            vbscript_indent_size: 4,
            jscript_indent_size: 2,
            vbscript_align_assignments: false,
            jscript_align_assignments: false,
            jscript_semicolons: true,
            max_line_length: 120,
            align_server_blocks: true,
            trim_trailing_whitespace: true,
            markup: MarkupOptions::default(),
        }
    }
}

impl Config {
    /// Minimum line length when breaking is enabled
    const MIN_LINE_LENGTH: usize = 40;
    /// Maximum reasonable line length
    const MAX_LINE_LENGTH: usize = 1000;
    /// Maximum reasonable indent size
    const MAX_INDENT: usize = 16;
    /// Maximum run of blank lines the markup formatter may keep
    const MAX_PRESERVE_NEWLINES: usize = 50;

    /// Validate configuration values are within reasonable bounds
    ///
    /// Returns an error message if validation fails, None if valid.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        for (name, value) in [
            ("vbscript_indent_size", self.vbscript_indent_size),
            ("jscript_indent_size", self.jscript_indent_size),
            ("markup.indent_size", self.markup.indent_size),
        ] {
            if value == 0 {
                return Some(format!("{name} must be at least 1"));
            }
            if value > Self::MAX_INDENT {
                return Some(format!(
                    "{name} {value} exceeds maximum of {}",
                    Self::MAX_INDENT
                ));
            }
        }
        if self.max_line_length != 0 && self.max_line_length < Self::MIN_LINE_LENGTH {
            return Some(format!(
                "max_line_length {} is below minimum of {} (use 0 to disable breaking)",
                self.max_line_length,
                Self::MIN_LINE_LENGTH
            ));
        }
        if self.max_line_length > Self::MAX_LINE_LENGTH {
            return Some(format!(
                "max_line_length {} exceeds maximum of {}",
                self.max_line_length,
                Self::MAX_LINE_LENGTH
            ));
        }
        let wrap = self.markup.wrap_line_length;
        if wrap != 0 && !(Self::MIN_LINE_LENGTH..=Self::MAX_LINE_LENGTH).contains(&wrap) {
            return Some(format!(
                "markup.wrap_line_length {wrap} must be 0 or between {} and {}",
                Self::MIN_LINE_LENGTH,
                Self::MAX_LINE_LENGTH
            ));
        }
        if self.markup.max_preserve_newlines > Self::MAX_PRESERVE_NEWLINES {
            return Some(format!(
                "markup.max_preserve_newlines {} exceeds maximum of {} (use 0 to keep all)",
                self.markup.max_preserve_newlines,
                Self::MAX_PRESERVE_NEWLINES
            ));
        }
        if !WRAP_ATTRIBUTE_MODES.contains(&self.markup.wrap_attributes.as_str()) {
            return Some(format!(
                "markup.wrap_attributes \"{}\" is not one of {}",
                self.markup.wrap_attributes,
                WRAP_ATTRIBUTE_MODES.join(", ")
            ));
        }
        None
    }

    /// Copy with every size pulled into the range [`validate`](Self::validate) accepts.
    ///
    /// Unknown `wrap_attributes` modes fall back to `auto`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let line_length = |value: usize| match value {
            0 => 0,
            v => v.clamp(Self::MIN_LINE_LENGTH, Self::MAX_LINE_LENGTH),
        };
        let mut config = self.clone();
        config.vbscript_indent_size = self.vbscript_indent_size.clamp(1, Self::MAX_INDENT);
        config.jscript_indent_size = self.jscript_indent_size.clamp(1, Self::MAX_INDENT);
        config.max_line_length = line_length(self.max_line_length);
        config.markup.indent_size = self.markup.indent_size.clamp(1, Self::MAX_INDENT);
        config.markup.wrap_line_length = line_length(self.markup.wrap_line_length);
        config.markup.max_preserve_newlines = self
            .markup
            .max_preserve_newlines
            .min(Self::MAX_PRESERVE_NEWLINES);
        if !WRAP_ATTRIBUTE_MODES.contains(&config.markup.wrap_attributes.as_str()) {
            config.markup.wrap_attributes = "auto".to_string();
        }
        config
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let partial: PartialConfig = toml::from_str(&contents)?;
        let mut config = Self::default();
        config.apply_partial(&partial);
        Ok(config)
    }

    /// Apply a partial config, only overriding fields that are explicitly set
    fn apply_partial(&mut self, partial: &PartialConfig) {
        if let Some(v) = partial.preserve_asp_comments {
            self.preserve_asp_comments = v;
        }
        if let Some(v) = partial.preserve_include_directives {
            self.preserve_include_directives = v;
        }
        if let Some(v) = partial.detect_asp_language {
            self.detect_asp_language = v;
        }
        if let Some(v) = partial.format_vbscript_in_blocks {
            self.format_vbscript_in_blocks = v;
        }
        if let Some(v) = partial.format_jscript_in_blocks {
            self.format_jscript_in_blocks = v;
        }
        if let Some(v) = partial.vbscript_indent_size {
            self.vbscript_indent_size = v;
        }
        if let Some(v) = partial.jscript_indent_size {
            self.jscript_indent_size = v;
        }
        if let Some(v) = partial.vbscript_align_assignments {
            self.vbscript_align_assignments = v;
        }
        if let Some(v) = partial.jscript_align_assignments {
            self.jscript_align_assignments = v;
        }
        if let Some(v) = partial.jscript_semicolons {
            self.jscript_semicolons = v;
        }
        if let Some(v) = partial.max_line_length {
            self.max_line_length = v;
        }
        if let Some(v) = partial.align_server_blocks {
            self.align_server_blocks = v;
        }
        if let Some(v) = partial.trim_trailing_whitespace {
            self.trim_trailing_whitespace = v;
        }

        let markup = &partial.markup;
        if let Some(v) = markup.indent_size {
            self.markup.indent_size = v;
        }
        if let Some(v) = markup.indent_with_tabs {
            self.markup.indent_with_tabs = v;
        }
        if let Some(v) = markup.wrap_line_length {
            self.markup.wrap_line_length = v;
        }
        if let Some(v) = markup.preserve_newlines {
            self.markup.preserve_newlines = v;
        }
        if let Some(v) = markup.max_preserve_newlines {
            self.markup.max_preserve_newlines = v;
        }
        if let Some(v) = &markup.wrap_attributes {
            self.markup.wrap_attributes.clone_from(v);
        }
        if let Some(v) = markup.end_with_newline {
            self.markup.end_with_newline = v;
        }
    }

    /// Discover config files from parent directories of a given path
    ///
    /// Searches from the file's directory up to the root, then adds home directory config.
    /// Returns list of config file paths in order of priority (least specific first).
    #[must_use]
    pub fn discover_config_files(start_path: &Path) -> Vec<PathBuf> {
        let mut config_files = Vec::new();

        // Home directory config first (lowest priority)
        if let Some(home) = dirs_home() {
            for config_name in CONFIG_FILE_NAMES {
                let home_config = home.join(config_name);
                if home_config.is_file() {
                    config_files.push(home_config);
                }
            }
        }

        let start_dir = if start_path.is_file() {
            start_path.parent().map(Path::to_path_buf)
        } else if start_path.is_dir() {
            Some(start_path.to_path_buf())
        } else {
            std::env::current_dir().ok()
        };

        if let Some(dir) = start_dir {
            let mut ancestors: Vec<PathBuf> = dir.ancestors().map(Path::to_path_buf).collect();
            // Root first, so nearer files override farther ones
            ancestors.reverse();

            for ancestor in ancestors {
                for config_name in CONFIG_FILE_NAMES {
                    let config_path = ancestor.join(config_name);
                    if config_path.is_file() && !config_files.contains(&config_path) {
                        config_files.push(config_path);
                    }
                }
            }
        }

        config_files
    }

    /// Load and merge configuration from discovered config files
    ///
    /// Later files override earlier ones (only explicitly set values).
    /// Returns default config if no files found.
    #[must_use]
    pub fn from_discovered_files(start_path: &Path) -> Self {
        let mut config = Self::default();
        for path in &Self::discover_config_files(start_path) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<PartialConfig>(&contents) {
                    Ok(partial) => config.apply_partial(&partial),
                    Err(e) => eprintln!("Warning: failed to parse {}: {e}", path.display()),
                },
                Err(e) => eprintln!("Warning: failed to read {}: {e}", path.display()),
            }
        }
        config
    }

    /// Beautifier options for VBScript blocks
    #[must_use]
    pub fn vbscript_options(&self) -> ScriptOptions {
        ScriptOptions {
            indent_size: self.vbscript_indent_size,
            max_line_length: self.max_line_length,
            align_assignments: self.vbscript_align_assignments,
            statement_terminators: false,
        }
    }

    /// Beautifier options for JScript blocks
    #[must_use]
    pub fn jscript_options(&self) -> ScriptOptions {
        ScriptOptions {
            indent_size: self.jscript_indent_size,
            max_line_length: self.max_line_length,
            align_assignments: self.jscript_align_assignments,
            statement_terminators: self.jscript_semicolons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.preserve_asp_comments);
        assert!(config.format_vbscript_in_blocks);
        assert!(!config.format_jscript_in_blocks);
        assert_eq!(config.vbscript_indent_size, 4);
        assert_eq!(config.jscript_indent_size, 2);
        assert_eq!(config.max_line_length, 120);
        assert_eq!(config.markup.max_preserve_newlines, 2);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let partial: PartialConfig = toml::from_str("").unwrap();
        let mut config = Config::default();
        config.apply_partial(&partial);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_apply_partial() {
        let partial: PartialConfig = toml::from_str(
            "vbscript_indent_size = 2\nformat_jscript_in_blocks = true\n[markup]\nindent_with_tabs = true\n",
        )
        .unwrap();
        let mut config = Config::default();
        config.apply_partial(&partial);
        assert_eq!(config.vbscript_indent_size, 2);
        assert!(config.format_jscript_in_blocks);
        assert!(config.markup.indent_with_tabs);
        // Unset fields keep their values
        assert_eq!(config.jscript_indent_size, 2);
        assert_eq!(config.markup.indent_size, 4);
    }

    #[test]
    fn test_config_apply_partial_preserves_unset() {
        let mut config = Config {
            max_line_length: 80,
            ..Default::default()
        };
        let partial = PartialConfig {
            jscript_semicolons: Some(false),
            ..Default::default()
        };
        config.apply_partial(&partial);
        assert_eq!(config.max_line_length, 80);
        assert!(!config.jscript_semicolons);
    }

    #[test]
    fn test_script_options() {
        let config = Config {
            jscript_semicolons: false,
            vbscript_align_assignments: true,
            ..Default::default()
        };
        let vb = config.vbscript_options();
        assert_eq!(vb.indent_size, 4);
        assert!(vb.align_assignments);
        assert!(!vb.statement_terminators);
        let js = config.jscript_options();
        assert_eq!(js.indent_size, 2);
        assert!(!js.statement_terminators);
    }

    #[test]
    fn test_discover_nearest_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("site");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            dir.path().join("aspfmt.toml"),
            "vbscript_indent_size = 3\nmax_line_length = 90\n",
        )
        .unwrap();
        std::fs::write(nested.join("aspfmt.toml"), "vbscript_indent_size = 2\n").unwrap();
        let page = nested.join("index.asp");
        std::fs::write(&page, "<% x %>").unwrap();

        let files = Config::discover_config_files(&page);
        let outer = files.iter().position(|p| p == &dir.path().join("aspfmt.toml"));
        let inner = files.iter().position(|p| p == &nested.join("aspfmt.toml"));
        assert!(outer < inner, "farther config must come first: {files:?}");

        let config = Config::from_discovered_files(&page);
        assert_eq!(config.vbscript_indent_size, 2);
        assert_eq!(config.max_line_length, 90);
    }

    #[test]
    fn test_from_toml_file_rejects_bad_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aspfmt.toml");
        std::fs::write(&path, "max_line_length = \"long\"\n").unwrap();
        assert!(Config::from_toml_file(&path).is_err());
    }

    #[test]
    fn test_validate_default_config() {
        assert!(
            Config::default().validate().is_none(),
            "Default config should be valid"
        );
    }

    #[test]
    fn test_validate_indent() {
        let config = Config {
            vbscript_indent_size: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap().contains("vbscript_indent_size"));
        let config = Config {
            jscript_indent_size: 40,
            ..Default::default()
        };
        assert!(config.validate().unwrap().contains("jscript_indent_size"));
    }

    #[test]
    fn test_validate_line_length() {
        let config = Config {
            max_line_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_none(), "0 disables breaking");
        let config = Config {
            max_line_length: 10,
            ..Default::default()
        };
        assert!(config.validate().unwrap().contains("max_line_length"));
        let config = Config {
            max_line_length: 5000,
            ..Default::default()
        };
        assert!(config.validate().is_some());
    }

    #[test]
    fn test_validate_blank_line_limit() {
        let mut config = Config::default();
        config.markup.max_preserve_newlines = 100;
        assert!(config.validate().unwrap().contains("max_preserve_newlines"));
    }

    #[test]
    fn test_zero_blank_line_limit_from_toml() {
        let partial: PartialConfig =
            toml::from_str("[markup]\nmax_preserve_newlines = 0\n").unwrap();
        let mut config = Config::default();
        config.apply_partial(&partial);
        assert_eq!(config.markup.max_preserve_newlines, 0);
        assert!(config.validate().is_none());
        assert!(!config.markup.exceeds_blank_limit(40));
    }

    #[test]
    fn test_validate_markup_wrapping() {
        let mut config = Config::default();
        config.markup.wrap_attributes = "sideways".to_string();
        assert!(config.validate().unwrap().contains("wrap_attributes"));

        let mut config = Config::default();
        config.markup.wrap_line_length = 5;
        assert!(config.validate().unwrap().contains("wrap_line_length"));
        config.markup.wrap_line_length = 0;
        assert!(config.validate().is_none());
    }

    #[test]
    fn test_clamped() {
        let mut config = Config {
            vbscript_indent_size: usize::MAX,
            jscript_indent_size: 0,
            max_line_length: 10,
            ..Default::default()
        };
        config.markup.indent_size = 99;
        config.markup.max_preserve_newlines = usize::MAX;
        config.markup.wrap_attributes = "sideways".to_string();

        let clamped = config.clamped();
        assert_eq!(clamped.vbscript_indent_size, 16);
        assert_eq!(clamped.jscript_indent_size, 1);
        assert_eq!(clamped.max_line_length, 40);
        assert_eq!(clamped.markup.indent_size, 16);
        assert_eq!(clamped.markup.max_preserve_newlines, 50);
        assert_eq!(clamped.markup.wrap_attributes, "auto");
        assert!(clamped.validate().is_none());
        assert_eq!(Config::default().clamped(), Config::default());
    }
}
