//! Configuration management for the letter generator

use crate::error::{LetterError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw configuration structure matching the `.config` file exactly
#[derive(Debug, Deserialize)]
struct RawConfig {
    pub driver: String,

    #[serde(default)]
    pub server: String,

    pub database: String,

    #[serde(default)]
    pub uid: String,

    #[serde(default)]
    pub pwd: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_queries_dir")]
    pub queries_dir: PathBuf,

    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default)]
    pub renderer: RendererConfig,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterConfig {
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    Postgres,
    MySql,
    Sqlite,
}

impl DatabaseDriver {
    fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseDriver::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseDriver::MySql),
            "sqlite" | "sqlite3" => Ok(DatabaseDriver::Sqlite),
            other => Err(LetterError::Config(format!(
                "Unsupported database driver '{}' (expected postgres, mysql or sqlite)",
                other
            ))),
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            DatabaseDriver::Postgres => "postgres",
            DatabaseDriver::MySql => "mysql",
            DatabaseDriver::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub server: String,
    pub port: Option<u16>,
    pub database: String,
    pub uid: String,
    pub pwd: String,
}

impl DatabaseConfig {
    /// Connection URL understood by the `sqlx` any-driver.
    /// For SQLite `database` is the file path and the file must already exist.
    pub fn connection_url(&self) -> String {
        match self.driver {
            DatabaseDriver::Sqlite => format!("sqlite://{}", self.database),
            driver => {
                let host = match self.port {
                    Some(port) => format!("{}:{}", self.server, port),
                    None => self.server.clone(),
                };
                let credentials = if self.pwd.is_empty() {
                    encode_userinfo(&self.uid)
                } else {
                    format!("{}:{}", encode_userinfo(&self.uid), encode_userinfo(&self.pwd))
                };
                format!("{}://{}@{}/{}", driver.scheme(), credentials, host, self.database)
            }
        }
    }

    /// Connection description safe to write to logs
    pub fn describe(&self) -> String {
        match self.driver {
            DatabaseDriver::Sqlite => format!("sqlite database {}", self.database),
            driver => format!("{} database {} on {}", driver.scheme(), self.database, self.server),
        }
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn encode_userinfo(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub queries_dir: PathBuf,
    pub output_root: PathBuf,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_binary")]
    pub binary: PathBuf,

    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            binary: default_renderer_binary(),
            proxy: None,
        }
    }
}

// Default functions
fn default_queries_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("missed_bin_letters.log")
}

fn default_renderer_binary() -> PathBuf {
    PathBuf::from("wkhtmltopdf")
}

impl LetterConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LetterError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::from_json_str(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw_config: RawConfig = serde_json::from_str(json)
            .map_err(|e| LetterError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self::from_raw_config(raw_config)?;
        config.validate()?;
        Ok(config)
    }

    fn from_raw_config(raw: RawConfig) -> Result<Self> {
        let database = DatabaseConfig {
            driver: DatabaseDriver::parse(&raw.driver)?,
            server: raw.server,
            port: raw.port,
            database: raw.database,
            uid: raw.uid,
            pwd: raw.pwd,
        };

        Ok(Self {
            database,
            paths: PathsConfig {
                queries_dir: raw.queries_dir,
                output_root: raw.output_root,
                log_file: raw.log_file,
            },
            renderer: raw.renderer,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.database.trim().is_empty() {
            return Err(LetterError::Config("Database name is required".to_string()));
        }

        if self.database.driver != DatabaseDriver::Sqlite {
            if self.database.server.trim().is_empty() {
                return Err(LetterError::Config("Database server is required".to_string()));
            }
            if self.database.uid.trim().is_empty() {
                return Err(LetterError::Config("Database uid is required".to_string()));
            }
        }

        if self.renderer.binary.as_os_str().is_empty() {
            return Err(LetterError::Config("Renderer binary is required".to_string()));
        }

        Ok(())
    }
}
