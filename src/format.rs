//! Document formats and the parser shared by every backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Format of the configuration documents served by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Json,
    Yaml,
    Toml,
}

impl ConfigType {
    /// Canonical file extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            ConfigType::Json => "json",
            ConfigType::Yaml => "yaml",
            ConfigType::Toml => "toml",
        }
    }

    /// File names tried, in order, when looking up the document for `name`.
    pub fn candidate_files(self, name: &str) -> Vec<String> {
        let mut files = vec![format!("{}.{}", name, self.extension())];
        if self == ConfigType::Yaml {
            files.push(format!("{}.yml", name));
        }
        files
    }

    /// Parse a document into a snapshot root.
    ///
    /// The root must be a mapping. An empty (or whitespace only) document is an
    /// empty mapping for every format.
    pub fn parse(self, bytes: &[u8]) -> Result<Map<String, Value>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        let value = match self {
            ConfigType::Json => {
                serde_json::from_slice::<Value>(bytes).map_err(|e| ConfigError::parse(self, e))?
            }
            ConfigType::Yaml => {
                serde_yaml::from_slice::<Value>(bytes).map_err(|e| ConfigError::parse(self, e))?
            }
            ConfigType::Toml => {
                let text = std::str::from_utf8(bytes).map_err(|e| ConfigError::parse(self, e))?;
                let table: toml::Value =
                    toml::from_str(text).map_err(|e| ConfigError::parse(self, e))?;
                toml_to_json(table)
            }
        };

        match value {
            Value::Object(map) => Ok(map),
            // a YAML document holding only `~`
            Value::Null => Ok(Map::new()),
            other => Err(ConfigError::parse(
                self,
                format!("document root must be a mapping, found {}", kind_of(&other)),
            )),
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ConfigType::Json),
            "yaml" | "yml" => Ok(ConfigType::Yaml),
            "toml" => Ok(ConfigType::Toml),
            other => Err(format!(
                "unsupported config type {:?}, should be one of json, yaml or toml",
                other
            )),
        }
    }
}

/// Short name of a value's kind, used in conversion errors.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_each_format() {
        let json_doc = ConfigType::Json.parse(br#"{"db": {"port": 5432}}"#).unwrap();
        let yaml_doc = ConfigType::Yaml.parse(b"db:\n  port: 5432\n").unwrap();
        let toml_doc = ConfigType::Toml.parse(b"[db]\nport = 5432\n").unwrap();

        let expected = json!({"db": {"port": 5432}});
        assert_eq!(Value::Object(json_doc), expected);
        assert_eq!(Value::Object(yaml_doc), expected);
        assert_eq!(Value::Object(toml_doc), expected);
    }

    #[test]
    fn test_toml_datetime_becomes_string() {
        let doc = ConfigType::Toml
            .parse(b"released = 1979-05-27T07:32:00Z\n")
            .unwrap();
        assert_eq!(doc["released"], json!("1979-05-27T07:32:00Z"));
    }

    #[test]
    fn test_empty_document_is_empty_map() {
        for format in [ConfigType::Json, ConfigType::Yaml, ConfigType::Toml] {
            assert!(format.parse(b"  \n").unwrap().is_empty());
        }
    }

    #[test]
    fn test_non_mapping_root_rejected() {
        let err = ConfigType::Json.parse(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: ConfigType::Json, .. }));

        assert!(ConfigType::Yaml.parse(b"level: [unclosed").is_err());
    }

    #[test]
    fn test_candidate_files() {
        assert_eq!(ConfigType::Json.candidate_files("app"), vec!["app.json"]);
        assert_eq!(
            ConfigType::Yaml.candidate_files("app"),
            vec!["app.yaml", "app.yml"]
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("YAML".parse::<ConfigType>(), Ok(ConfigType::Yaml));
        assert!("ini".parse::<ConfigType>().is_err());
    }
}
