// Configuration types module
// Defines the server configuration file layout and the raw handler options

use serde::de::IgnoredAny;
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub static_files: StaticFilesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    /// Seconds allowed for reading a request head
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub max_body_size: u64,
}

/// `[static_files]` table: the served root plus the handler options
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    pub root: String,
    /// Read from the same table by `Config::load_from` as a typed value, so
    /// string overrides from the environment still convert
    #[serde(skip)]
    pub options: StaticOptions,
}

/// Raw handler options, as written by the user.
///
/// Every field is optional; defaults and validation are applied once by
/// `StaticConfig::from_options`.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StaticOptions {
    /// Allowed request methods (default `["GET"]`)
    pub method: Option<Vec<String>>,
    /// Render directory listings (default true)
    pub show_dir_contents: Option<bool>,
    /// Index file search order
    pub index: Option<IndexOption>,
    /// Path prefix claimed by the handler
    pub url_prefix: Option<String>,
    /// Top-level segments left to the next handler, with leading `/`
    pub urls_reserved: Option<Vec<String>>,
    pub template: TemplateOptions,
    /// Send validators and `public` cache headers (default false)
    pub browser_cache_enabled: Option<bool>,
    /// `max-age` in seconds when browser caching is on (default 3600)
    pub browser_cache_max_age: Option<u64>,
    /// Deprecated name of `browser_cache_enabled`
    pub enable_caching: Option<bool>,
    /// Deprecated name of `browser_cache_max_age`
    pub cache_max_age: Option<u64>,
    /// Resolve against the URI as received rather than a rewritten one (default true)
    pub use_original_url: Option<bool>,
}

/// Template routing options; the renderer itself is supplied in code
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TemplateOptions {
    pub ext: Vec<String>,
}

/// `index` option: a list of entries, or the legacy single file name
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum IndexOption {
    Legacy(String),
    List(Vec<IndexEntry>),
}

/// One element of the `index` list
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum IndexEntry {
    /// Exact file name
    Name(String),
    /// Regular expression searched in the file name
    Pattern {
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Anything else is accepted and dropped during validation
    Other(IgnoredAny),
}

impl IndexEntry {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn pattern(pattern: impl Into<String>, case_insensitive: bool) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            case_insensitive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_list_forms() {
        let opts: StaticOptions = toml::from_str(
            r#"
            index = ["index.html", { pattern = "index\\.htm", case_insensitive = true }, 42, true]
            "#,
        )
        .unwrap();
        let Some(IndexOption::List(entries)) = opts.index else {
            panic!("expected list form");
        };
        assert_eq!(entries.len(), 4);
        assert!(matches!(&entries[0], IndexEntry::Name(n) if n == "index.html"));
        assert!(matches!(
            &entries[1],
            IndexEntry::Pattern { pattern, case_insensitive: true } if pattern == "index\\.htm"
        ));
        assert!(matches!(entries[2], IndexEntry::Other(_)));
        assert!(matches!(entries[3], IndexEntry::Other(_)));
    }

    #[test]
    fn test_index_legacy_form() {
        let opts: StaticOptions = toml::from_str(r#"index = "home.html""#).unwrap();
        assert!(matches!(opts.index, Some(IndexOption::Legacy(ref n)) if n == "home.html"));
    }

    #[test]
    fn test_defaults_are_empty() {
        let opts: StaticOptions = toml::from_str("").unwrap();
        assert!(opts.method.is_none());
        assert!(opts.index.is_none());
        assert!(opts.template.ext.is_empty());
        assert!(opts.browser_cache_enabled.is_none());
    }

    #[test]
    fn test_static_files_table() {
        let table = r#"
            root = "/srv/www"
            url_prefix = "/files"
            urls_reserved = ["/private"]
            template = { ext = ["ejs"] }
            browser_cache_enabled = true
            "#;
        let cfg: StaticFilesConfig = toml::from_str(table).unwrap();
        assert_eq!(cfg.root, "/srv/www");
        assert!(cfg.options.url_prefix.is_none());

        let opts: StaticOptions = toml::from_str(table).unwrap();
        assert_eq!(opts.url_prefix.as_deref(), Some("/files"));
        assert_eq!(opts.template.ext, vec!["ejs".to_string()]);
        assert_eq!(opts.browser_cache_enabled, Some(true));
    }
}
