//! Static string tables shipped with the application.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Namespace used by keys without a `namespace::` prefix.
pub const DEFAULT_NAMESPACE: &str = "*";

/// Items of one group: each value is a string or a nested array/object.
pub type Lines = Map<String, Value>;

pub trait StaticLoader: Send + Sync {
    /// Load the lines for `group` in `locale`. Missing groups are empty.
    fn load(&self, namespace: &str, group: &str, locale: &str) -> Result<Lines>;
}

/// Find `item` in `lines`, descending into nested objects on `.`.
pub fn lookup_item<'a>(lines: &'a Lines, item: &str) -> Option<&'a Value> {
    if let Some(value) = lines.get(item) {
        return Some(value);
    }

    let mut parts = item.split('.');
    let mut current = lines.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Reads `{root}/{locale}/{group}.json`, or
/// `{root}/vendor/{namespace}/{locale}/{group}.json` for namespaced keys.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    root: PathBuf,
}

impl JsonFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn group_path(&self, namespace: &str, group: &str, locale: &str) -> PathBuf {
        let base = if namespace == DEFAULT_NAMESPACE {
            self.root.clone()
        } else {
            self.root.join("vendor").join(namespace)
        };
        base.join(locale).join(format!("{}.json", group))
    }
}

impl StaticLoader for JsonFileLoader {
    fn load(&self, namespace: &str, group: &str, locale: &str) -> Result<Lines> {
        let path = self.group_path(namespace, group, locale);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No static strings at {}", path.display());
                return Ok(Lines::new());
            }
            Err(e) => return Err(loader_error(&path, e)),
        };

        match serde_json::from_str::<Value>(&content).map_err(|e| loader_error(&path, e))? {
            Value::Object(lines) => Ok(lines),
            _ => Err(loader_error(&path, "expected a JSON object")),
        }
    }
}

fn loader_error(path: &Path, message: impl ToString) -> Error {
    Error::Loader {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Loader backed by in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    groups: HashMap<(String, String, String), Lines>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(mut self, namespace: &str, group: &str, locale: &str, lines: Value) -> Self {
        if let Value::Object(lines) = lines {
            self.groups.insert(
                (namespace.to_string(), group.to_string(), locale.to_string()),
                lines,
            );
        }
        self
    }
}

impl StaticLoader for MemoryLoader {
    fn load(&self, namespace: &str, group: &str, locale: &str) -> Result<Lines> {
        Ok(self
            .groups
            .get(&(namespace.to_string(), group.to_string(), locale.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
