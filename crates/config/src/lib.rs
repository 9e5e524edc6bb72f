use derive_more::derive::From;
use serde::de::DeserializeOwned;

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    Unreadable {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[from(ignore)]
    Malformed {
        path: Option<std::path::PathBuf>,
        source: toml::de::Error,
    },

    MissingSection(String),
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::MissingSection(_) => None,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, source } => {
                write!(f, "can't read config {}: {source}", path.display())
            }
            Self::Malformed {
                path: Some(path),
                source,
            } => write!(f, "bad config {}: {source}", path.display()),
            Self::Malformed { path: None, source } => write!(f, "bad config: {source}"),
            Self::MissingSection(name) => write!(f, "config has no [{name}] section"),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// `value_from_path` returns the raw `toml::Value` of the file so callers can
/// probe sections without committing to a type.
pub fn value_from_path<V: Into<std::path::PathBuf>>(target: V) -> ConfigResult<toml::Value> {
    from_path(target)
}

/// `from_path` reads and deserializes the TOML file at `target`.
pub fn from_path<T, V>(target: V) -> ConfigResult<T>
where
    T: DeserializeOwned,
    V: Into<std::path::PathBuf>,
{
    let target_path = target.into();
    let config_content =
        std::fs::read_to_string(&target_path).map_err(|source| ConfigError::Unreadable {
            path: target_path.clone(),
            source,
        })?;

    toml::from_str(&config_content).map_err(|source| ConfigError::Malformed {
        path: Some(target_path),
        source,
    })
}

pub fn from_str<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    toml::from_str(content).map_err(|source| ConfigError::Malformed { path: None, source })
}

/// `section` deserializes the named top-level table of `value`.
pub fn section<T: DeserializeOwned>(value: &toml::Value, name: &str) -> ConfigResult<T> {
    let table = value
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::MissingSection(name.to_string()))?;

    table
        .try_into()
        .map_err(|source| ConfigError::Malformed { path: None, source })
}
