//! Layered runtime settings.
//!
//! Every setting is declared once in [`SETTINGS`] with its TOML path, the environment variables
//! that can set it and its default. Raw values are layered in the order default, config file,
//! environment, explicit override. The winning value is then parsed into [`AppConfig`], and each
//! key remembers which layer supplied it.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err("expected compact, pretty or json".to_string()),
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Values that outrank the environment, e.g. from test setup or command-line flags.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

impl ConfigOverrides {
    fn entries(self) -> [(&'static str, Option<String>); 4] {
        [
            ("database.url", self.database_url),
            ("logging.level", self.log_level),
            ("server.bind_address", self.bind_address),
            ("server.port", self.port.map(|port| port.to_string())),
        ]
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Read this file instead of probing `campusmart.toml` and `config/campusmart.toml`.
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum SettingSource {
    Default,
    File(PathBuf),
    Env(&'static str),
    Override,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::File(path) => write!(f, "file ({})", path.display()),
            Self::Env(key) => write!(f, "env ({key})"),
            Self::Override => f.write_str("override"),
        }
    }
}

impl From<SettingSource> for String {
    fn from(source: SettingSource) -> Self {
        source.to_string()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file references `${{{var}}}` but it is not set")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated `${{` in config file")]
    UnterminatedInterpolation,
    #[error("invalid value `{value}` for `{key}` from {layer}: {reason}")]
    InvalidValue { key: &'static str, value: String, layer: SettingSource, reason: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

struct Setting {
    key: &'static str,
    env: &'static [&'static str],
    default: &'static str,
}

const SETTINGS: &[Setting] = &[
    Setting {
        key: "database.url",
        env: &["CAMPUSMART_DATABASE_URL"],
        default: "sqlite://campusmart.db?mode=rwc",
    },
    Setting {
        key: "database.max_connections",
        env: &["CAMPUSMART_DATABASE_MAX_CONNECTIONS"],
        default: "5",
    },
    Setting {
        key: "database.timeout_secs",
        env: &["CAMPUSMART_DATABASE_TIMEOUT_SECS"],
        default: "30",
    },
    Setting {
        key: "server.bind_address",
        env: &["CAMPUSMART_SERVER_BIND_ADDRESS"],
        default: "0.0.0.0",
    },
    Setting { key: "server.port", env: &["CAMPUSMART_SERVER_PORT"], default: "5001" },
    Setting {
        key: "server.graceful_shutdown_secs",
        env: &["CAMPUSMART_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        default: "15",
    },
    Setting {
        key: "logging.level",
        env: &["CAMPUSMART_LOGGING_LEVEL", "CAMPUSMART_LOG_LEVEL"],
        default: "info",
    },
    Setting {
        key: "logging.format",
        env: &["CAMPUSMART_LOGGING_FORMAT", "CAMPUSMART_LOG_FORMAT"],
        default: "compact",
    },
];

/// The effective configuration plus the layer that supplied each key.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    pub sources: BTreeMap<&'static str, SettingSource>,
}

type RawValues = BTreeMap<&'static str, (String, SettingSource)>;

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Self::resolve(options).map(|resolved| resolved.config)
    }

    pub fn resolve(options: LoadOptions) -> Result<ResolvedConfig, ConfigError> {
        let mut raw: RawValues = SETTINGS
            .iter()
            .map(|setting| (setting.key, (setting.default.to_string(), SettingSource::Default)))
            .collect();

        if let Some(path) = config_file(options.config_path.as_deref()) {
            layer_file(&mut raw, &path)?;
        }
        layer_env(&mut raw);
        for (key, value) in options.overrides.entries() {
            if let Some(value) = value {
                raw.insert(key, (value, SettingSource::Override));
            }
        }

        let config = Self {
            database: DatabaseConfig {
                url: text(&raw, "database.url"),
                max_connections: parsed(&raw, "database.max_connections")?,
                timeout_secs: parsed(&raw, "database.timeout_secs")?,
            },
            server: ServerConfig {
                bind_address: text(&raw, "server.bind_address"),
                port: parsed(&raw, "server.port")?,
                graceful_shutdown_secs: parsed(&raw, "server.graceful_shutdown_secs")?,
            },
            logging: LoggingConfig {
                level: text(&raw, "logging.level"),
                format: parsed(&raw, "logging.format")?,
            },
        };
        config.validate()?;

        let sources = raw.into_iter().map(|(key, (_, source))| (key, source)).collect();
        Ok(ResolvedConfig { config, sources })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        if !(url.starts_with("sqlite:") || url == ":memory:") {
            return Err(invalid(
                "database.url must be a sqlite URL (`sqlite://...` or `sqlite::...`)",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be greater than zero"));
        }
        if !(1..=300).contains(&self.database.timeout_secs) {
            return Err(invalid("database.timeout_secs must be in range 1..=300"));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(invalid("server.bind_address must not be empty"));
        }
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than zero"));
        }
        if self.server.graceful_shutdown_secs == 0 {
            return Err(invalid("server.graceful_shutdown_secs must be greater than zero"));
        }
        let level = self.logging.level.trim().to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(invalid("logging.level must be one of trace|debug|info|warn|error"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => ["campusmart.toml", "config/campusmart.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
    }
}

fn layer_file(raw: &mut RawValues, path: &Path) -> Result<(), ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let document: toml::Table = toml::from_str(&interpolate(&contents)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;

    for setting in SETTINGS {
        let (section, field) = setting.key.split_once('.').unwrap_or(("", setting.key));
        let value = match document.get(section).and_then(|table| table.get(field)) {
            Some(toml::Value::String(value)) => value.clone(),
            Some(other) => other.to_string(),
            None => continue,
        };
        raw.insert(setting.key, (value, SettingSource::File(path.to_path_buf())));
    }
    Ok(())
}

/// First non-blank variable wins, so `*_LOGGING_*` outranks the shorter `*_LOG_*` alias.
fn layer_env(raw: &mut RawValues) {
    for setting in SETTINGS {
        let found = setting.env.iter().find_map(|key| {
            env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
        });
        if let Some((key, value)) = found {
            raw.insert(setting.key, (value, SettingSource::Env(key)));
        }
    }
}

/// Expands `${VAR}` from the process environment.
fn interpolate(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn text(raw: &RawValues, key: &'static str) -> String {
    raw.get(key).map(|(value, _)| value.clone()).unwrap_or_default()
}

fn parsed<T>(raw: &RawValues, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let (value, layer) =
        raw.get(key).cloned().unwrap_or((String::new(), SettingSource::Default));
    value.trim().parse::<T>().map_err(|error| ConfigError::InvalidValue {
        key,
        value,
        layer,
        reason: error.to_string(),
    })
}
