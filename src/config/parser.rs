use crate::config::types::MirrorConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use toml::{Table, Value};

/// Loads and parses a configuration file from the given path
///
/// Files ending in `.toml` are read as TOML; anything else is read as the flat
/// `key=value` format (`config.txt`).
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_mirror::config::load_config;
///
/// let config = load_config(Path::new("config.txt")).unwrap();
/// println!("Max pages: {}", config.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<MirrorConfig, ConfigError> {
    load_config_with_overrides(path, Table::new())
}

/// Loads a configuration file and layers `overrides` (typically CLI flags) on top
///
/// A missing file is tolerated: the overrides and the defaults must then be enough
/// to produce a valid configuration.
pub fn load_config_with_overrides(
    path: &Path,
    overrides: Table,
) -> Result<MirrorConfig, ConfigError> {
    let mut table = match std::fs::read_to_string(path) {
        Ok(content) => parse_table(path, &content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "Configuration file '{}' not found, using defaults",
                path.display()
            );
            Table::new()
        }
        Err(e) => return Err(e.into()),
    };

    table.extend(overrides);

    let config: MirrorConfig = Value::Table(table).try_into()?;
    validate(&config)?;

    Ok(config)
}

fn parse_table(path: &Path, content: &str) -> Result<Table, ConfigError> {
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    if is_toml {
        Ok(toml::from_str(content)?)
    } else {
        parse_flat(content)
    }
}

/// Parses the flat `key=value` format into a TOML table
///
/// Blank lines and lines starting with `#` are skipped. Values are typed by
/// inference so they deserialize through the same schema as TOML files.
pub fn parse_flat(content: &str) -> Result<Table, ConfigError> {
    let mut table = Table::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Syntax {
            line: index + 1,
            message: format!("expected key=value, got '{}'", line),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Syntax {
                line: index + 1,
                message: "empty key".to_string(),
            });
        }

        table.insert(key.to_string(), infer_value(value.trim()));
    }

    Ok(table)
}

/// Types a raw flat-file value: integer, float, boolean word, or string
pub fn infer_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Integer(n);
    }

    if raw.contains('.') && raw.chars().all(|c| c.is_ascii_digit() || c == '.') {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
    }

    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Value::Boolean(true),
        "false" | "no" | "off" => Value::Boolean(false),
        _ => Value::String(unquote(raw).to_string()),
    }
}

fn unquote(raw: &str) -> &str {
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')));
    if quoted {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be matched to the configuration they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
///
/// The hash is `None` when the file does not exist.
pub fn load_config_with_hash(
    path: &Path,
    overrides: Table,
) -> Result<(MirrorConfig, Option<String>), ConfigError> {
    let config = load_config_with_overrides(path, overrides)?;
    let hash = if path.exists() {
        Some(compute_config_hash(path)?)
    } else {
        None
    };
    Ok((config, hash))
}
