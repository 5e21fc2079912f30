use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "rustpower-web.toml";
pub const ENV_PREFIX: &str = "RPW_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// `"*"` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024,
            cors_origins: vec!["*".into()],
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Where session records live. `ttl_secs` is advertised for an external
/// sweeper; the server itself never expires records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub dir: PathBuf,
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("rustpower-web-sessions"),
            ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for daily JSON log files, in addition to stdout.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            dir: None,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if present), then `RPW_` variables
    /// with `__` separating sections, e.g. `RPW_SERVER__PORT`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.session.ttl_secs, 3600);
            assert_eq!(cfg.logging.level, "info");
            assert_eq!(cfg.server.cors_origins, ["*"]);
            Ok(())
        });
    }

    #[test]
    fn file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [server]
                port = 9100
                host = "127.0.0.1"

                [session]
                dir = "/srv/sessions"
                "#,
            )?;
            jail.set_env("RPW_SERVER__PORT", "9200");
            jail.set_env("RPW_LOGGING__LEVEL", "debug");

            let cfg = Config::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.port, 9200);
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.session.dir, PathBuf::from("/srv/sessions"));
            assert_eq!(cfg.session.ttl_secs, 3600);
            assert_eq!(cfg.logging.level, "debug");
            assert_eq!(
                cfg.server.socket_addr().map_err(|e| e.to_string())?,
                "127.0.0.1:9200".parse::<SocketAddr>().map_err(|e| e.to_string())?
            );
            Ok(())
        });
    }

    #[test]
    fn explicit_file_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[session]\nttl_secs = 60\n")?;
            let cfg = Config::load(Some(Path::new("custom.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(cfg.session.ttl_secs, 60);
            Ok(())
        });
    }

    #[test]
    fn bad_values_are_reported() {
        Jail::expect_with(|jail| {
            jail.set_env("RPW_SERVER__PORT", "not-a-port");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }
}
