use std::collections::BTreeMap;
use std::path::Path;

use ferry_util::errors::FerryResult;

/// Loads a shell-style `KEY=value` env file.
///
/// `~/.ferry/credentials.env` holds signing keys and repository
/// credentials outside of any project checkout. Lines starting with `#` are
/// comments; values may be wrapped in single or double quotes. Values are
/// also available via `${env:VAR}` interpolation in `Ferry.toml`.
pub fn load_env_file(path: &Path) -> FerryResult<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content = std::fs::read_to_string(path)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    Ok(map)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Interpolate `${env:VAR}` references in a string.
///
/// Looks up values first from the provided `env_overrides` map, then falls
/// back to actual process environment variables. Substituted values are
/// copied verbatim and never expanded again.
pub fn interpolate(input: &str, env_overrides: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${env:") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let end = start + end;
        let key = &rest[start + 6..end];
        result.push_str(&rest[..start]);
        match env_overrides.get(key) {
            Some(value) => result.push_str(value),
            None => result.push_str(&std::env::var(key).unwrap_or_default()),
        }
        rest = &rest[end + 1..];
    }
    result.push_str(rest);
    result
}

/// Immutable snapshot of process-wide configuration values.
///
/// Taken once at pipeline start so a changing environment cannot produce
/// an inconsistent run.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Snapshot the secrets file at `env_file` overlaid with the process
    /// environment (environment wins).
    pub fn snapshot(env_file: &Path) -> FerryResult<Self> {
        let mut values = load_env_file(env_file)?;
        values.extend(std::env::vars());
        Ok(Self { values })
    }

    /// Value for `key`, treating empty strings as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// First set key among `keys`, together with its value.
    pub fn first_of<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, &str)> {
        keys.iter()
            .find_map(|key| self.get(key).map(|value| (*key, value)))
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
