//! Tool definitions and the immutable catalog
//!
//! Definitions come either from a tool repository on disk
//! (`tools_index.json` plus one JSON file per tool) or from the robot
//! server's `/tools` listing in function-tool format.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const INDEX_FILE: &str = "tools_index.json";

/// Errors loading or assembling a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid tool listing: {0}")]
    InvalidListing(String),
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),
    #[error("Failed to fetch tools: {0}")]
    Fetch(String),
}

/// Arguments that do not fit a tool's declared parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Missing required parameter '{0}'")]
    MissingRequired(String),
    #[error("Unexpected parameter '{0}'")]
    Unexpected(String),
    #[error("Parameter '{name}' must be of type {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: ParameterType,
        found: String,
    },
    #[error("Parameter '{name}' must be one of {allowed}, got {found}")]
    NotAllowed {
        name: String,
        allowed: String,
        found: String,
    },
}

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    #[default]
    Any,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
            ParameterType::Any => "any",
        }
    }

    /// Check `value` against this type, coercing numeric and boolean strings
    fn coerce(self, value: Value) -> Result<Value, Value> {
        match (self, value) {
            (ParameterType::Any, v) => Ok(v),
            (ParameterType::String, v @ Value::String(_))
            | (ParameterType::Boolean, v @ Value::Bool(_))
            | (ParameterType::Array, v @ Value::Array(_))
            | (ParameterType::Object, v @ Value::Object(_))
            | (ParameterType::Number, v @ Value::Number(_)) => Ok(v),
            (ParameterType::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Ok(Value::Number(n))
                } else {
                    Err(Value::Number(n))
                }
            }
            (ParameterType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or(Value::String(s)),
            (ParameterType::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| Value::String(s)),
            (ParameterType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(Value::String(s)),
            },
            (_, other) => Err(other),
        }
    }
}

impl From<String> for ParameterType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" => ParameterType::String,
            "number" | "float" => ParameterType::Number,
            "integer" | "int" => ParameterType::Integer,
            "boolean" | "bool" => ParameterType::Boolean,
            "array" => ParameterType::Array,
            "object" => ParameterType::Object,
            _ => ParameterType::Any,
        }
    }
}

impl From<ParameterType> for String {
    fn from(t: ParameterType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            allowed: None,
            default: None,
        }
    }

    #[must_use]
    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        if self.kind != ParameterType::Any {
            schema.insert("type".into(), json!(self.kind.as_str()));
        }
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(allowed) = &self.allowed {
            schema.insert("enum".into(), Value::Array(allowed.clone()));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        Value::Object(schema)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    pub required: Vec<ParameterSpec>,
    #[serde(default)]
    pub optional: Vec<ParameterSpec>,
}

/// A tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    #[must_use]
    pub fn with_required(mut self, spec: ParameterSpec) -> Self {
        self.parameters.required.push(spec);
        self
    }

    #[must_use]
    pub fn with_optional(mut self, spec: ParameterSpec) -> Self {
        self.parameters.optional.push(spec);
        self
    }

    fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .required
            .iter()
            .chain(&self.parameters.optional)
            .find(|p| p.name == name)
    }

    /// JSON schema of the arguments object
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .required
            .iter()
            .chain(&self.parameters.optional)
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> =
            self.parameters.required.iter().map(|p| p.name.as_str()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Function-tool rendering used in completion requests
    pub fn to_function_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema(),
            }
        })
    }

    /// Parse a function-tool entry back into a definition
    pub fn from_function_tool(tool: &Value) -> Result<Self, CatalogError> {
        let function = tool.get("function").unwrap_or(tool);
        let name = function
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CatalogError::InvalidListing(format!("tool without a name: {tool}")))?;
        let description = function
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let parameters = function.get("parameters");
        let required_names: Vec<&str> = parameters
            .and_then(|p| p.get("required"))
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut definition = ToolDefinition::new(name, description);
        if let Some(Value::Object(properties)) = parameters.and_then(|p| p.get("properties")) {
            for (param_name, schema) in properties {
                let spec = ParameterSpec {
                    name: param_name.clone(),
                    kind: schema
                        .get("type")
                        .and_then(Value::as_str)
                        .map(|t| ParameterType::from(t.to_string()))
                        .unwrap_or_default(),
                    description: schema
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    allowed: schema.get("enum").and_then(Value::as_array).cloned(),
                    default: schema.get("default").cloned(),
                };
                if required_names.contains(&param_name.as_str()) {
                    definition.parameters.required.push(spec);
                } else {
                    definition.parameters.optional.push(spec);
                }
            }
        }
        Ok(definition)
    }

    /// Check arguments against the declared parameters.
    ///
    /// Explicit nulls for optional parameters count as omitted. Numeric and
    /// boolean strings are coerced to their declared type.
    pub fn validate(
        &self,
        arguments: Map<String, Value>,
    ) -> Result<Map<String, Value>, ArgumentError> {
        let mut validated = Map::new();

        for (name, value) in arguments {
            let spec = self
                .parameter(&name)
                .ok_or_else(|| ArgumentError::Unexpected(name.clone()))?;

            if value.is_null() {
                continue;
            }

            let value = spec.kind.coerce(value).map_err(|found| ArgumentError::TypeMismatch {
                name: name.clone(),
                expected: spec.kind,
                found: json_type_name(&found).to_string(),
            })?;

            if let Some(allowed) = &spec.allowed {
                if !allowed.contains(&value) {
                    return Err(ArgumentError::NotAllowed {
                        name,
                        allowed: Value::Array(allowed.clone()).to_string(),
                        found: value.to_string(),
                    });
                }
            }

            validated.insert(name, value);
        }

        if let Some(missing) = self
            .parameters
            .required
            .iter()
            .find(|p| !validated.contains_key(&p.name))
        {
            return Err(ArgumentError::MissingRequired(missing.name.clone()));
        }

        Ok(validated)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Immutable set of tools available to a session
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    definitions: Vec<ToolDefinition>,
    by_name: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct ToolIndex {
    #[serde(default)]
    tools: Vec<ToolIndexEntry>,
}

#[derive(Debug, Deserialize)]
struct ToolIndexEntry {
    name: String,
    definition_file: PathBuf,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ToolCatalog {
    pub fn from_definitions(definitions: Vec<ToolDefinition>) -> Result<Self, CatalogError> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        for (i, definition) in definitions.iter().enumerate() {
            if by_name.insert(definition.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateTool(definition.name.clone()));
            }
        }
        Ok(Self {
            definitions,
            by_name,
        })
    }

    /// Load a tool repository: `tools_index.json` lists the tools and the
    /// definition file of each. Disabled entries are skipped; a definition
    /// that cannot be loaded is logged and skipped.
    pub fn load_repository(root: &Path) -> Result<Self, CatalogError> {
        let index_path = root.join(INDEX_FILE);
        let index: ToolIndex = read_json(&index_path)?;

        let mut definitions = Vec::new();
        for entry in index.tools {
            if !entry.enabled {
                tracing::debug!(tool = %entry.name, "Skipping disabled tool");
                continue;
            }
            let path = root.join(&entry.definition_file);
            match read_json::<ToolDefinition>(&path) {
                Ok(mut definition) => {
                    if definition.name != entry.name {
                        tracing::warn!(
                            index_name = %entry.name,
                            definition_name = %definition.name,
                            "Tool name differs between index and definition, using index name"
                        );
                        definition.name = entry.name;
                    }
                    definitions.push(definition);
                }
                Err(e) => {
                    tracing::warn!(
                        tool = %entry.name,
                        error = %e,
                        "Failed to load tool definition"
                    );
                }
            }
        }

        let catalog = Self::from_definitions(definitions)?;
        tracing::info!(tools = catalog.len(), path = %root.display(), "Loaded tool repository");
        Ok(catalog)
    }

    /// Build from a `{"tools": [<function tool>, ...]}` listing
    pub fn from_listing(listing: &Value) -> Result<Self, CatalogError> {
        let tools = listing
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| CatalogError::InvalidListing("missing 'tools' array".to_string()))?;
        let definitions = tools
            .iter()
            .map(ToolDefinition::from_function_tool)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_definitions(definitions)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.by_name.get(name).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
