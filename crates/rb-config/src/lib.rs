//! Configuration management for rb.
//!
//! Parses `rb.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `directives.default_namespace`
//! - `templates.source_dir`
//! - `templates.output_dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override template source directory.
    pub source_dir: Option<PathBuf>,
    /// Override compiled template output directory.
    pub output_dir: Option<PathBuf>,
    /// Override namespace for unqualified directives.
    pub default_namespace: Option<String>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "rb.toml";

/// Default template glob, relative to the source directory.
const DEFAULT_PATTERN: &str = "**/*.blade.php";

/// Upper bound for `directives.max_depth`.
const MAX_NESTING_DEPTH: usize = 256;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directive preprocessing configuration.
    pub directives: DirectivesConfig,
    /// Template configuration (paths are relative strings from TOML).
    templates: TemplatesConfigRaw,

    /// Resolved template configuration (set after loading).
    #[serde(skip)]
    pub templates_resolved: TemplatesConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Directive preprocessing configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DirectivesConfig {
    /// Namespace used for directives written without one.
    pub default_namespace: String,
    /// Maximum nesting depth of block directives.
    pub max_depth: usize,
}

impl Default for DirectivesConfig {
    fn default() -> Self {
        Self {
            default_namespace: "Directives".to_owned(),
            max_depth: 16,
        }
    }
}

/// Raw template configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TemplatesConfigRaw {
    source_dir: Option<String>,
    output_dir: Option<String>,
    pattern: Option<String>,
}

/// Resolved template configuration with absolute paths.
#[derive(Debug, Default)]
pub struct TemplatesConfig {
    /// Directory containing the templates to compile.
    pub source_dir: PathBuf,
    /// Directory receiving compiled templates.
    pub output_dir: PathBuf,
    /// Glob selecting templates, relative to `source_dir`.
    pub pattern: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`templates.source_dir`").
        field: String,
        /// Error message (e.g., "${`VIEWS_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a namespace made of word characters and `\` separators.
fn require_namespace(value: &str, field: &str) -> Result<(), ConfigError> {
    require_non_empty(value, field)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '\\')
    {
        return Err(ConfigError::Validation(format!(
            "{field} may only contain letters, digits, '_' and '\\', got {value:?}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rb.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.templates_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.templates_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(namespace) = &settings.default_namespace {
            self.directives.default_namespace.clone_from(namespace);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    /// Search for config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            directives: DirectivesConfig::default(),
            templates: TemplatesConfigRaw::default(),
            templates_resolved: TemplatesConfig {
                source_dir: base.join("views"),
                output_dir: base.join("build/views"),
                pattern: DEFAULT_PATTERN.to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_directives()?;
        self.validate_templates()?;
        Ok(())
    }

    /// Validate directives configuration.
    fn validate_directives(&self) -> Result<(), ConfigError> {
        require_namespace(
            &self.directives.default_namespace,
            "directives.default_namespace",
        )?;

        let depth = self.directives.max_depth;
        if depth == 0 {
            return Err(ConfigError::Validation(
                "directives.max_depth must be greater than 0".to_owned(),
            ));
        }
        if depth > MAX_NESTING_DEPTH {
            return Err(ConfigError::Validation(format!(
                "directives.max_depth cannot exceed {MAX_NESTING_DEPTH}"
            )));
        }

        Ok(())
    }

    /// Validate templates configuration.
    fn validate_templates(&self) -> Result<(), ConfigError> {
        let pattern = &self.templates_resolved.pattern;
        require_non_empty(pattern, "templates.pattern")?;
        glob::Pattern::new(pattern).map_err(|e| {
            ConfigError::Validation(format!("templates.pattern is not a valid glob: {e}"))
        })?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.directives.default_namespace = expand::expand_env(
            &self.directives.default_namespace,
            "directives.default_namespace",
        )?;

        if let Some(ref dir) = self.templates.source_dir {
            self.templates.source_dir = Some(expand::expand_env(dir, "templates.source_dir")?);
        }
        if let Some(ref dir) = self.templates.output_dir {
            self.templates.output_dir = Some(expand::expand_env(dir, "templates.output_dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.templates_resolved = TemplatesConfig {
            source_dir: resolve(self.templates.source_dir.as_deref(), "views"),
            output_dir: resolve(self.templates.output_dir.as_deref(), "build/views"),
            pattern: self
                .templates
                .pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_PATTERN.to_owned()),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.directives.default_namespace, "Directives");
        assert_eq!(config.directives.max_depth, 16);
        assert_eq!(
            config.templates_resolved.source_dir,
            PathBuf::from("/test/views")
        );
        assert_eq!(
            config.templates_resolved.output_dir,
            PathBuf::from("/test/build/views")
        );
        assert_eq!(config.templates_resolved.pattern, "**/*.blade.php");
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.directives.default_namespace, "Directives");
        assert_eq!(config.directives.max_depth, 16);
    }

    #[test]
    fn test_parse_directives_config() {
        let toml = r#"
[directives]
default_namespace = 'App\Html'
max_depth = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.directives.default_namespace, r"App\Html");
        assert_eq!(config.directives.max_depth, 4);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[templates]
source_dir = "resources/views"
output_dir = "storage/compiled"
pattern = "**/*.php"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.templates_resolved.source_dir,
            PathBuf::from("/project/resources/views")
        );
        assert_eq!(
            config.templates_resolved.output_dir,
            PathBuf::from("/project/storage/compiled")
        );
        assert_eq!(config.templates_resolved.pattern, "**/*.php");
    }

    #[test]
    fn test_resolve_paths_defaults() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.templates_resolved.source_dir,
            PathBuf::from("/project/views")
        );
        assert_eq!(config.templates_resolved.pattern, "**/*.blade.php");
    }

    #[test]
    fn test_apply_cli_settings_source_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            source_dir: Some(PathBuf::from("/custom/views")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.templates_resolved.source_dir,
            PathBuf::from("/custom/views")
        );
        assert_eq!(
            config.templates_resolved.output_dir,
            PathBuf::from("/test/build/views")
        ); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            source_dir: Some(PathBuf::from("/in")),
            output_dir: Some(PathBuf::from("/out")),
            default_namespace: Some("Html".to_owned()),
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.templates_resolved.source_dir, PathBuf::from("/in"));
        assert_eq!(config.templates_resolved.output_dir, PathBuf::from("/out"));
        assert_eq!(config.directives.default_namespace, "Html");
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let config_before = Config::default_with_base(Path::new("/test"));
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(
            config.directives.default_namespace,
            config_before.directives.default_namespace
        );
        assert_eq!(
            config.templates_resolved.source_dir,
            config_before.templates_resolved.source_dir
        );
    }

    #[test]
    fn test_expand_env_vars_templates() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("RB_TEST_VIEWS", "/srv/views");
        }

        let toml = r#"
[templates]
source_dir = "${RB_TEST_VIEWS}"
output_dir = "${RB_TEST_UNSET_OUT:-compiled}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.templates_resolved.source_dir,
            PathBuf::from("/srv/views")
        );
        assert_eq!(
            config.templates_resolved.output_dir,
            PathBuf::from("/project/compiled")
        );

        unsafe {
            std::env::remove_var("RB_TEST_VIEWS");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RB_TEST_MISSING_NS");
        }

        let toml = r#"
[directives]
default_namespace = "${RB_TEST_MISSING_NS}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("directives.default_namespace"));
        assert!(err.to_string().contains("RB_TEST_MISSING_NS"));
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_namespace_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.directives.default_namespace = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("directives.default_namespace"));
    }

    #[test]
    fn test_validate_namespace_invalid_chars() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.directives.default_namespace = "App::Html".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_namespace_with_backslashes() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.directives.default_namespace = r"App\View\Directives".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_depth_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.directives.max_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_max_depth_too_high() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.directives.max_depth = 257;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("256"));
    }

    #[test]
    fn test_validate_invalid_pattern() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.templates_resolved.pattern = "views/[".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("templates.pattern"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[directives]\ndefault_namespace = \"Html\"\n\n[templates]\nsource_dir = \"tpl\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.directives.default_namespace, "Html");
        assert_eq!(config.templates_resolved.source_dir, dir.path().join("tpl"));
        assert_eq!(
            config.templates_resolved.output_dir,
            dir.path().join("build/views")
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[directives\n").unwrap();
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_validates_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let overrides = CliSettings {
            default_namespace: Some("bad namespace".to_owned()),
            ..Default::default()
        };
        let err = Config::load(Some(&path), Some(&overrides)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(
            Config::discover_from(&nested),
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }
}
