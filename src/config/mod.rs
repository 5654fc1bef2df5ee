// Configuration module entry point
// Loads configuration and turns the [site] table into a try-files handler

mod state;
mod types;

use std::net::SocketAddr;
use std::path::Path;

use crate::fs::DirFs;
use crate::handler::TryFiles;
use crate::request::{self, Request};

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig, PerformanceConfig, ServerConfig, SiteConfig};

/// Environment variable prefix, e.g. `TRYFILES_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "TRYFILES";

impl Config {
    /// Load configuration from specified file path
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("site.try_files")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Build the frozen try-files handler described by `[site]`
    pub fn build_handler(&self) -> Result<TryFiles, String> {
        let site = &self.site;
        let mut handler = TryFiles::new().try_files(site.try_files.iter().cloned());

        if let Some(ref root) = site.root {
            if !Path::new(root).is_dir() {
                return Err(format!("Site root is not a directory: {root}"));
            }
            handler = handler.fs(DirFs::new(root), Vec::<String>::new());
        }

        let prefix = site.strip_prefix.clone().filter(|p| !p.is_empty());
        let suffix = site.strip_suffix.clone().filter(|s| !s.is_empty());
        handler = match (prefix, suffix) {
            (Some(prefix), Some(suffix)) => {
                let strip_prefix = request::strip_prefix(prefix);
                let strip_suffix = request::strip_suffix(suffix);
                handler.rewrite(move |req: Request| strip_suffix(strip_prefix(req)))
            }
            (Some(prefix), None) => handler.strip_prefix(prefix),
            (None, Some(suffix)) => handler.strip_suffix(suffix),
            (None, None) => handler,
        };

        Ok(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ResponseBuffer;
    use hyper::StatusCode;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> String {
        let path = dir.join("tryfiles.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let cfg = Config::load_from(&missing.to_string_lossy()).unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.site, SiteConfig::default());
        assert_eq!(cfg.site.try_files, ["/index.html"]);
        assert_eq!(cfg.site.pool_warm_up, 64);
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
    }

    #[test]
    fn test_site_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[server]
port = 9090

[site]
root = "public"
try_files = ["/app.html", "/index.html"]
strip_prefix = "/static"
pool_warm_up = 8
"#,
        );
        let cfg = Config::load_from(&path).unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.site.root.as_deref(), Some("public"));
        assert_eq!(cfg.site.try_files, ["/app.html", "/index.html"]);
        assert_eq!(cfg.site.strip_prefix.as_deref(), Some("/static"));
        assert_eq!(cfg.site.strip_suffix, None);
        assert_eq!(cfg.site.pool_warm_up, 8);
    }

    #[test]
    fn test_invalid_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[server]\nhost = \"not an ip\"\n");
        let cfg = Config::load_from(&path).unwrap();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_build_handler_serves_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<app/>").unwrap();
        std::fs::write(dir.path().join("robots.txt"), "User-agent: *").unwrap();

        let mut cfg = Config::load_from(&dir.path().join("absent").to_string_lossy()).unwrap();
        cfg.site.root = Some(dir.path().to_string_lossy().into_owned());
        cfg.site.strip_prefix = Some("/site".to_string());
        cfg.site.strip_suffix = Some(".bak".to_string());
        let handler = cfg.build_handler().unwrap();
        assert!(handler.has_fs());

        let mut sink = ResponseBuffer::new();
        handler.handle(&mut sink, Request::get("/site/robots.txt.bak"));
        assert_eq!(sink.status(), Some(StatusCode::OK));
        assert_eq!(sink.body(), b"User-agent: *");

        let mut sink = ResponseBuffer::new();
        handler.handle(&mut sink, Request::get("/site/settings/profile"));
        assert_eq!(sink.body(), b"<app/>");
    }

    #[test]
    fn test_build_handler_without_root() {
        let cfg = Config::load_from("definitely-not-here").unwrap();
        let handler = cfg.build_handler().unwrap();
        assert!(!handler.has_fs());

        let mut sink = ResponseBuffer::new();
        handler.handle(&mut sink, Request::get("/index.html"));
        assert_eq!(sink.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_build_handler_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load_from(&dir.path().join("absent").to_string_lossy()).unwrap();
        cfg.site.root = Some(dir.path().join("nope").to_string_lossy().into_owned());
        assert!(cfg.build_handler().is_err());
    }
}
