// OpenAPI document model and corpus formatting
// Only the parts of the OpenAPI object that end up in the indexed prose are modelled here

pub mod formatter;


use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::AssistantError;

pub use formatter::{DocumentMetadata, FormattedDocument, format_documents};

/// Prefix of the first line of every operation document
pub const ENDPOINT_LINE_PREFIX: &str = "API Endpoint: ";

/// Parsed OpenAPI document, with map order preserved as written in the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenApiDocument {
    pub info: Info,
    pub servers: Option<Vec<Server>>,
    pub paths: Vec<PathEntry>,
    /// Component schemas stay as raw JSON so that a malformed entry only affects its own document
    pub schemas: Vec<(String, Value)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Info {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Server {
    pub url: Option<String>,
    pub description: Option<String>,
}

/// All operations declared under a single path
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry {
    pub path: String,
    pub operations: Vec<(HttpMethod, Operation)>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub operation_id: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    #[serde(deserialize_with = "ordered_entries")]
    pub responses: Vec<(String, Response)>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Parameter {
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub location: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Kept raw and parsed when rendered, so an unusual schema only degrades its own lines
    pub schema: Option<Value>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    pub description: Option<String>,
    pub required: bool,
    #[serde(deserialize_with = "ordered_entries")]
    pub content: Vec<(String, MediaType)>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Response {
    pub description: Option<String>,
    #[serde(deserialize_with = "ordered_entries")]
    pub content: Vec<(String, MediaType)>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediaType {
    pub schema: Option<Value>,
}

/// The subset of a JSON schema that is rendered into prose
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemaObject {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub schema_type: Option<Value>,
    pub format: Option<Value>,
    pub default: Option<Value>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub items: Option<Value>,
    #[serde(deserialize_with = "ordered_entries")]
    pub properties: Vec<(String, Value)>,
    pub required: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    info: Info,
    servers: Option<Vec<Server>>,
    #[serde(default, deserialize_with = "ordered_entries")]
    paths: Vec<(String, Map<String, Value>)>,
    #[serde(default)]
    components: RawComponents,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(default, deserialize_with = "ordered_entries")]
    schemas: Vec<(String, Value)>,
}

/// HTTP methods that may appear as operation keys in an OpenAPI path item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub const ALL: [Self; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = AssistantError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AssistantError::Source(format!("Unknown HTTP method: {}", s)))
    }
}

/// A `METHOD /path` pair as it appears on the first line of an operation document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
}

impl Endpoint {
    #[inline]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// Parse a single endpoint line, with or without the `API Endpoint:` prefix
    #[inline]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let line = line.strip_prefix(ENDPOINT_LINE_PREFIX).unwrap_or(line);
        let (method, path) = line.split_once(' ')?;
        let method = method.parse().ok()?;

        if path.is_empty() {
            return None;
        }

        Some(Self::new(method, path))
    }

    /// Find the endpoint line of a formatted operation document
    #[inline]
    pub fn from_document_text(text: &str) -> Option<Self> {
        text.lines()
            .find(|line| line.starts_with(ENDPOINT_LINE_PREFIX))
            .and_then(Self::parse_line)
    }
}

impl fmt::Display for Endpoint {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl OpenApiDocument {
    /// Load an OpenAPI JSON document from disk
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssistantError> {
        let path = path.as_ref();
        debug!("Loading OpenAPI document from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            AssistantError::Source(format!("Failed to read {}: {}", path.display(), e))
        })?;

        content.parse()
    }

    /// Total number of (path, method) operations in the document
    #[inline]
    pub fn operation_count(&self) -> usize {
        self.paths.iter().map(|entry| entry.operations.len()).sum()
    }

    fn from_raw(raw: RawDocument) -> Self {
        let paths = raw
            .paths
            .into_iter()
            .map(|(path, item)| PathEntry::from_path_item(path, item))
            .collect();

        Self {
            info: raw.info,
            servers: raw.servers,
            paths,
            schemas: raw.components.schemas,
        }
    }
}

impl FromStr for OpenApiDocument {
    type Err = AssistantError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawDocument = serde_json::from_str(s)
            .map_err(|e| AssistantError::Source(format!("Invalid OpenAPI JSON: {}", e)))?;
        Ok(Self::from_raw(raw))
    }
}

impl PathEntry {
    fn from_path_item(path: String, item: Map<String, Value>) -> Self {
        let shared_parameters = parse_parameters(item.get("parameters"), &path);

        let mut operations = Vec::new();
        for (key, value) in item {
            // Path items also carry non-operation keys such as `summary` or `servers`
            let Ok(method) = key.parse::<HttpMethod>() else {
                continue;
            };

            let mut operation: Operation = match serde_json::from_value(value.clone()) {
                Ok(operation) => operation,
                Err(e) => {
                    warn!("Operation {} {} is partly invalid: {}", method, path, e);
                    Operation::parse_lenient(&value, &format!("{} {}", method, path))
                }
            };
            operation.inherit_parameters(&shared_parameters);
            operations.push((method, operation));
        }

        Self { path, operations }
    }
}

impl Operation {
    /// Field by field parse, dropping only the parts that do not deserialize
    fn parse_lenient(value: &Value, context: &str) -> Self {
        let responses = value
            .get("responses")
            .and_then(Value::as_object)
            .map(|responses| {
                responses
                    .iter()
                    .filter_map(|(status, raw)| {
                        lenient::<Response>(raw, &format!("response {} of {}", status, context))
                            .map(|response| (status.clone(), response))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            summary: lenient_field(value, "summary", context),
            description: lenient_field(value, "description", context),
            tags: lenient_field(value, "tags", context).unwrap_or_default(),
            operation_id: lenient_field(value, "operationId", context),
            parameters: parse_parameters(value.get("parameters"), context),
            request_body: lenient_field(value, "requestBody", context),
            responses,
        }
    }

    /// Prepend path-level parameters not overridden by an operation parameter with the same name and location
    fn inherit_parameters(&mut self, shared: &[Parameter]) {
        if shared.is_empty() {
            return;
        }

        let mut merged: Vec<Parameter> = shared
            .iter()
            .filter(|candidate| {
                !self.parameters.iter().any(|own| {
                    own.name.is_some()
                        && own.name == candidate.name
                        && own.location == candidate.location
                })
            })
            .cloned()
            .collect();
        merged.append(&mut self.parameters);
        self.parameters = merged;
    }
}

/// Parse a parameter list one entry at a time, skipping entries that do not deserialize
fn parse_parameters(raw: Option<&Value>, context: &str) -> Vec<Parameter> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let Some(entries) = raw.as_array() else {
        warn!("Parameters of {} are not a list", context);
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| lenient(entry, &format!("parameter of {}", context)))
        .collect()
}

fn lenient_field<T: DeserializeOwned>(value: &Value, key: &str, context: &str) -> Option<T> {
    value
        .get(key)
        .and_then(|raw| lenient(raw, &format!("`{}` of {}", key, context)))
}

fn lenient<T: DeserializeOwned>(raw: &Value, context: &str) -> Option<T> {
    match serde_json::from_value(raw.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Skipping invalid {}: {}", context, e);
            None
        }
    }
}

/// Last segment of a `$ref` pointer, e.g. `#/components/schemas/Product` -> `Product`
#[inline]
pub fn reference_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Deserialize a JSON object into its entries, keeping the order in which they were written
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: DeserializeOwned> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a JSON object")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, T>()? {
                entries.push(entry);
            }
            Ok(entries)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}
