// Configuration module entry point
// Loads the server configuration and validates the static handler options

pub mod static_files;
pub mod types;

use std::net::SocketAddr;

// Re-export public types
pub use static_files::{StaticConfig, TemplateConfig, DEFAULT_CACHE_MAX_AGE};
pub use types::{
    Config, HttpConfig, IndexEntry, IndexOption, LoggingConfig, PerformanceConfig, ServerConfig,
    StaticFilesConfig, StaticOptions, TemplateOptions,
};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, ::config::ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(config_path).required(false))
            .add_source(::config::Environment::with_prefix("SERVER").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("static_files.root", ".")?
            .build()?;

        let mut config: Self = settings.clone().try_deserialize()?;
        config.static_files.options = settings.get("static_files")?;
        Ok(config)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Served root as an absolute path, relative roots resolve against the working directory
    pub fn static_root(&self) -> std::io::Result<std::path::PathBuf> {
        std::path::absolute(&self.static_files.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults_without_file() {
        let cfg = Config::load_from("/nonexistent/static-webserver-config").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert_eq!(cfg.static_files.root, ".");
        assert!(cfg.static_files.options.index.is_none());
        assert!(cfg.get_socket_addr().is_ok());
    }

    #[test]
    fn test_load_static_files_section() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[static_files]
root = "/srv/www"
index = ["index.html"]
url_prefix = "/files"
browser_cache_enabled = true
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let cfg = Config::load_from(path).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.static_files.root, "/srv/www");
        assert_eq!(cfg.static_files.options.url_prefix.as_deref(), Some("/files"));
        assert_eq!(cfg.static_files.options.browser_cache_enabled, Some(true));

        let static_cfg =
            StaticConfig::from_options(cfg.static_root().unwrap(), cfg.static_files.options, None)
                .unwrap();
        assert_eq!(static_cfg.index.len(), 1);
    }

    #[test]
    fn test_env_overrides_handler_options() {
        std::env::set_var("SERVER__STATIC_FILES__SHOW_DIR_CONTENTS", "false");
        std::env::set_var("SERVER__STATIC_FILES__BROWSER_CACHE_MAX_AGE", "60");
        let loaded = Config::load_from("/nonexistent/static-webserver-config");
        std::env::remove_var("SERVER__STATIC_FILES__SHOW_DIR_CONTENTS");
        std::env::remove_var("SERVER__STATIC_FILES__BROWSER_CACHE_MAX_AGE");

        let cfg = loaded.unwrap();
        assert_eq!(cfg.static_files.root, ".");
        assert_eq!(cfg.static_files.options.show_dir_contents, Some(false));
        assert_eq!(cfg.static_files.options.browser_cache_max_age, Some(60));
    }
}
