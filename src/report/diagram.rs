//! YAML dump to PlantUML JSON diagram.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value as JsonValue};
use serde_yaml::Value as YamlValue;

use crate::error::{ExternalError, ReportError};
use crate::external::run_process;

/// Turns a `@startjson` document into a rendered diagram.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, document: &str) -> Result<Vec<u8>, ExternalError>;
}

/// Default arguments after `plantuml -pipe`.
pub fn default_plantuml_args() -> Vec<String> {
    vec!["-tsvg".to_string()]
}

/// Pipes the document through `plantuml -pipe`.
#[derive(Debug, Clone)]
pub struct PlantUmlRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PlantUmlRenderer {
    /// Empty `args` selects [`default_plantuml_args`].
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        let args = if args.is_empty() {
            default_plantuml_args()
        } else {
            args
        };
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec!["-pipe".to_string()];
        args.extend(self.args.iter().cloned());
        args
    }
}

#[async_trait]
impl DiagramRenderer for PlantUmlRenderer {
    async fn render(&self, document: &str) -> Result<Vec<u8>, ExternalError> {
        run_process(
            &self.program,
            &self.command_args(),
            Some(document.as_bytes().to_vec()),
            self.timeout,
        )
        .await
    }
}

fn yaml_key(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Tagged(tagged) => yaml_key(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Convert a YAML value to JSON, keeping mapping order.
///
/// Non-string keys are stringified; non-finite floats become strings.
pub fn yaml_to_json(value: &YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(n.to_string()))
            }
        }
        YamlValue::String(s) => JsonValue::String(s.clone()),
        YamlValue::Sequence(items) => JsonValue::Array(items.iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => {
            let mut object = Map::new();
            for (key, value) in map {
                object.insert(yaml_key(key), yaml_to_json(value));
            }
            JsonValue::Object(object)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Parse the dump, unwrapping a lone top-level key.
pub fn parse_dump(yaml: &str) -> Result<JsonValue, ReportError> {
    let value: YamlValue =
        serde_yaml::from_str(yaml).map_err(|e| ReportError::Yaml(e.to_string()))?;
    let json = yaml_to_json(&value);
    match json {
        JsonValue::Object(map) if map.len() == 1 => {
            Ok(map.into_iter().next().map(|(_, v)| v).unwrap_or(JsonValue::Null))
        }
        other => Ok(other),
    }
}

/// JSON text, compact or indented by one space.
pub fn to_json(value: &JsonValue, pretty: bool) -> Result<String, ReportError> {
    if !pretty {
        return serde_json::to_string(value).map_err(|e| ReportError::Json(e.to_string()));
    }
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b" "));
    value
        .serialize(&mut serializer)
        .map_err(|e| ReportError::Json(e.to_string()))?;
    String::from_utf8(out).map_err(|e| ReportError::Json(e.to_string()))
}

/// The PlantUML `@startjson` document for a dump.
pub fn build_json_uml(yaml: &str, pretty: bool) -> Result<String, ReportError> {
    let json = to_json(&parse_dump(yaml)?, pretty)?;
    Ok(format!("@startjson\n{}\n@endjson\n", json))
}
