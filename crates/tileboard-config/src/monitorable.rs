use std::collections::BTreeMap;
use std::str::FromStr;

use tileboard_core::Variant;

use crate::ENV_PREFIX;

/// Env prefix of monitorable fields, e.g. `TILEBOARD_MONITORABLE_PINGDOM_TOKEN`
pub const MONITORABLE_ENV_PREFIX: &str = "TILEBOARD_MONITORABLE";

/// Env key holding `field` of a monitorable variant.
///
/// The default variant has no variant segment:
/// `TILEBOARD_MONITORABLE_PINGDOM_TOKEN` vs
/// `TILEBOARD_MONITORABLE_PINGDOM_SECONDARY_TOKEN`.
pub fn build_env_key(monitorable: &str, variant: &Variant, field: &str) -> String {
    if variant.is_default() {
        format!("{}_MONITORABLE_{}_{}", ENV_PREFIX, monitorable, field).to_uppercase()
    } else {
        format!(
            "{}_MONITORABLE_{}_{}_{}",
            ENV_PREFIX, monitorable, variant, field
        )
        .to_uppercase()
    }
}

/// Raw string fields of one monitorable variant, keyed by upper-case field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantFields(BTreeMap<String, String>);

impl VariantFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.insert(field, value.to_string());
        self
    }

    pub fn insert(&mut self, field: &str, value: String) {
        self.0.insert(field.to_uppercase(), value);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(&field.to_uppercase()).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get(field).unwrap_or(default)
    }

    /// Parse a field; `Ok(None)` when absent, `Err(raw)` when unparsable
    pub fn parse<T: FromStr>(&self, field: &str) -> Result<Option<T>, String> {
        match self.get(field) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Monitorable fields gathered from the config file and the environment
#[derive(Debug, Clone, Default)]
pub struct MonitorableSettings {
    /// monitorable (upper-case) -> variant -> fields
    file: BTreeMap<String, BTreeMap<Variant, VariantFields>>,
    /// env keys with `TILEBOARD_MONITORABLE_` stripped
    env: BTreeMap<String, String>,
}

impl MonitorableSettings {
    pub(crate) fn from_toml(tables: BTreeMap<String, BTreeMap<String, toml::Table>>) -> Self {
        let mut file = BTreeMap::new();
        for (monitorable, variants) in tables {
            let mut parsed = BTreeMap::new();
            for (variant, table) in variants {
                let mut fields = VariantFields::new();
                for (field, value) in table {
                    let value = match value {
                        toml::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    fields.insert(&field, value);
                }
                parsed.insert(Variant::new(variant.to_lowercase()), fields);
            }
            file.insert(monitorable.to_uppercase(), parsed);
        }
        Self {
            file,
            env: BTreeMap::new(),
        }
    }

    pub(crate) fn insert_env(&mut self, key: &str, value: String) {
        self.env.insert(key.to_uppercase(), value);
    }

    /// Set a field directly, as an env var would
    pub fn set(&mut self, monitorable: &str, variant: &Variant, field: &str, value: &str) {
        let key = build_env_key(monitorable, variant, field);
        if let Some(rest) = key.strip_prefix(&format!("{}_", MONITORABLE_ENV_PREFIX)) {
            self.insert_env(rest, value.to_string());
        }
    }

    /// Fields of every configured variant of `monitorable`.
    ///
    /// `fields` lists the field names the monitorable understands; env keys
    /// are split on them, so a variant name never swallows a field suffix.
    pub fn variants(&self, monitorable: &str, fields: &[&str]) -> BTreeMap<Variant, VariantFields> {
        let monitorable = monitorable.to_uppercase();
        let mut variants = self.file.get(&monitorable).cloned().unwrap_or_default();

        let mut fields: Vec<String> = fields.iter().map(|f| f.to_uppercase()).collect();
        // longest first: "INITIAL_MAX_DELAY" before "DELAY"
        fields.sort_by_key(|f| std::cmp::Reverse(f.len()));

        let prefix = format!("{}_", monitorable);
        for (key, value) in &self.env {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            for field in &fields {
                let variant = if rest == field {
                    Variant::default()
                } else if let Some(name) = rest
                    .strip_suffix(field.as_str())
                    .and_then(|r| r.strip_suffix('_'))
                    .filter(|name| !name.is_empty())
                {
                    Variant::new(name.to_lowercase())
                } else {
                    continue;
                };
                variants
                    .entry(variant)
                    .or_default()
                    .insert(field, value.clone());
                break;
            }
        }

        variants
    }
}
