#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    ENDPOINT_LINE_PREFIX, Endpoint, HttpMethod, MediaType, OpenApiDocument, Operation, Parameter,
    RequestBody, Response, SchemaObject, reference_name,
};

const DEFAULT_API_TITLE: &str = "API Dokumentácia";
const NOT_AVAILABLE: &str = "N/A";
const NO_PARAMETERS: &str = "  Žiadne.";
const NO_REQUEST_BODY: &str = "  Nie je definované.";
const NO_RESPONSES: &str = "  Nie sú definované.";
const UNFORMATTABLE_SCHEMA: &str = "(nepodarilo sa naformátovať JSON)";
const UNFORMATTABLE_PARAMETER_SCHEMA: &str = "(nepodarilo sa naformátovať schému)";
const DOCUMENT_SEPARATOR: &str = "---";

/// A self-contained block of prose ready to be embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Describes which part of the OpenAPI document a formatted document was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentMetadata {
    GeneralInfo {
        title: String,
    },
    Operation {
        path: String,
        method: HttpMethod,
        summary: String,
        tags: String,
    },
    SchemaDefinition {
        schema_name: String,
    },
}

impl DocumentMetadata {
    /// Tag stored alongside the record so results can be filtered by kind
    #[inline]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GeneralInfo { .. } => "general_info",
            Self::Operation { .. } => "operation",
            Self::SchemaDefinition { .. } => "schema_definition",
        }
    }

    /// Short human readable label, e.g. `GET /api/v1/products` or a schema name
    #[inline]
    pub fn label(&self) -> String {
        match self {
            Self::GeneralInfo { title } => title.clone(),
            Self::Operation { path, method, .. } => Endpoint::new(*method, path.as_str()).to_string(),
            Self::SchemaDefinition { schema_name } => schema_name.clone(),
        }
    }
}

/// Turn an OpenAPI document into the corpus that gets indexed.
///
/// The output always starts with the general information document, followed by one
/// document per operation and one per component schema, in source order.
#[inline]
pub fn format_documents(document: &OpenApiDocument) -> Vec<FormattedDocument> {
    let mut documents = Vec::with_capacity(1 + document.operation_count() + document.schemas.len());

    documents.push(format_general_info(document));

    for entry in &document.paths {
        for (method, operation) in &entry.operations {
            documents.push(format_operation(&entry.path, *method, operation));
        }
    }

    for (name, schema) in &document.schemas {
        documents.push(format_schema(name, schema));
    }

    info!(
        "Formatted {} documents from OpenAPI specification",
        documents.len()
    );
    documents
}

fn format_general_info(document: &OpenApiDocument) -> FormattedDocument {
    let info = &document.info;
    let title = info.title.as_deref().unwrap_or(DEFAULT_API_TITLE);

    let mut lines = vec![
        format!("Názov API: {}", title),
        format!("Verzia API: {}", info.version.as_deref().unwrap_or_default()),
    ];

    if let Some(description) = &info.description {
        lines.push(format!("Popis API: {}", description));
    }

    if let Some(servers) = &document.servers {
        lines.push("Servery:".to_string());
        for server in servers {
            lines.push(format!(
                "  - URL: {}, Popis: {}",
                server.url.as_deref().unwrap_or(NOT_AVAILABLE),
                server.description.as_deref().unwrap_or(NOT_AVAILABLE)
            ));
        }
    }

    FormattedDocument {
        text: finish(lines),
        metadata: DocumentMetadata::GeneralInfo {
            title: title.to_string(),
        },
    }
}

fn format_operation(path: &str, method: HttpMethod, operation: &Operation) -> FormattedDocument {
    let endpoint = Endpoint::new(method, path);
    debug!("Formatting operation {}", endpoint);

    let mut lines = vec![
        format!("{}{}", ENDPOINT_LINE_PREFIX, endpoint),
        format!(
            "Súhrn: {}",
            operation.summary.as_deref().unwrap_or(NOT_AVAILABLE)
        ),
    ];

    if let Some(description) = operation.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Popis: {}", description));
    }
    if !operation.tags.is_empty() {
        lines.push(format!("Tagy: {}", operation.tags.join(", ")));
    }
    if let Some(operation_id) = operation.operation_id.as_deref().filter(|id| !id.is_empty()) {
        lines.push(format!("Operation ID: {}", operation_id));
    }

    lines.push(String::new());
    lines.push("Parametre:".to_string());
    lines.extend(format_parameters(&operation.parameters));

    lines.push(String::new());
    lines.push("Request Body:".to_string());
    lines.extend(format_request_body(operation.request_body.as_ref()));

    lines.push(String::new());
    lines.push("Odpovede (Responses):".to_string());
    lines.extend(format_responses(&operation.responses));

    lines.push(String::new());
    lines.push(DOCUMENT_SEPARATOR.to_string());

    FormattedDocument {
        text: finish(lines),
        metadata: DocumentMetadata::Operation {
            path: path.to_string(),
            method,
            summary: operation.summary.clone().unwrap_or_default(),
            tags: operation.tags.join(", "),
        },
    }
}

/// Render the parameter list of an operation, or the "none" sentinel when there are no parameters
#[inline]
pub fn format_parameters(parameters: &[Parameter]) -> Vec<String> {
    if parameters.is_empty() {
        return vec![NO_PARAMETERS.to_string()];
    }

    let mut lines = Vec::new();
    for parameter in parameters {
        let name = parameter
            .name
            .as_deref()
            .or_else(|| parameter.reference.as_deref().map(reference_name))
            .unwrap_or(NOT_AVAILABLE);
        lines.push(format!("  - Meno: {}", name));
        lines.push(format!(
            "    Umiestnenie: {}",
            parameter.location.as_deref().unwrap_or(NOT_AVAILABLE)
        ));

        lines.extend(format_parameter_schema(name, parameter.schema.as_ref()));
        lines.push(format!(
            "    Popis: {}",
            parameter.description.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
        lines.push(format!("    Povinný: {}", yes_no(parameter.required)));
    }

    lines
}

fn format_parameter_schema(name: &str, raw: Option<&Value>) -> Vec<String> {
    let Some(raw) = raw else {
        return vec![format!("    Dátový typ: {}", NOT_AVAILABLE)];
    };

    let schema: SchemaObject = match serde_json::from_value(raw.clone()) {
        Ok(schema) => schema,
        Err(e) => {
            warn!("Could not parse schema of parameter {}: {}", name, e);
            return vec![
                format!(
                    "    Dátový typ: {}",
                    raw.get("type").map_or_else(|| NOT_AVAILABLE.to_string(), type_name)
                ),
                format!("    Schéma: {}", UNFORMATTABLE_PARAMETER_SCHEMA),
            ];
        }
    };

    let mut lines = vec![format!(
        "    Dátový typ: {}",
        schema
            .schema_type
            .as_ref()
            .map_or_else(|| NOT_AVAILABLE.to_string(), type_name)
    )];
    if let Some(format) = &schema.format {
        lines.push(format!("    Formát: {}", render_scalar(format)));
    }
    if let Some(default) = &schema.default {
        lines.push(format!("    Predvolená hodnota: {}", render_scalar(default)));
    }
    if let Some(values) = &schema.enum_values {
        lines.push(format!(
            "    Možné hodnoty (enum): {}",
            values.iter().map(render_scalar).join(", ")
        ));
    }

    lines
}

/// Render an operation's request body block
#[inline]
pub fn format_request_body(request_body: Option<&RequestBody>) -> Vec<String> {
    let Some(body) = request_body else {
        return vec![NO_REQUEST_BODY.to_string()];
    };

    let mut lines = Vec::new();
    if let Some(reference) = &body.reference {
        lines.push(format!(
            "  Odkaz: `{}` (Odkazuje na definíciu v 'components/requestBodies')",
            reference_name(reference)
        ));
    }
    lines.push(format!(
        "  Popis: {}",
        body.description.as_deref().unwrap_or(NOT_AVAILABLE)
    ));
    lines.push(format!("  Povinné: {}", yes_no(body.required)));

    if !body.content.is_empty() {
        lines.push("  Podporované Content-Types a ich schémy:".to_string());
        lines.extend(format_content(&body.content, 4));
    }

    lines
}

/// Render an operation's responses block, keyed by status code
#[inline]
pub fn format_responses(responses: &[(String, Response)]) -> Vec<String> {
    if responses.is_empty() {
        return vec![NO_RESPONSES.to_string()];
    }

    let mut lines = Vec::new();
    for (status, response) in responses {
        lines.push(format!("  - Status Kód: {}", status));
        lines.push(format!(
            "    Popis: {}",
            response.description.as_deref().unwrap_or(NOT_AVAILABLE)
        ));

        if !response.content.is_empty() {
            lines.push("    Podporované Content-Types a ich schémy:".to_string());
            lines.extend(format_content(&response.content, 6));
        }
    }

    lines
}

fn format_content(content: &[(String, MediaType)], indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    let mut lines = Vec::new();

    for (content_type, media) in content {
        lines.push(format!("{}- {}:", pad, content_type));

        let Some(schema) = &media.schema else {
            continue;
        };

        let schema_line = match schema.get("$ref").and_then(Value::as_str) {
            Some(reference) => format!(
                "Schéma: `{}` (Odkazuje na definíciu v 'components/schemas')",
                reference_name(reference)
            ),
            None => match to_indented_json(schema, indent) {
                Ok(json) => format!("Schéma: ```json\n{}\n```", json),
                Err(e) => {
                    warn!("Could not serialize inline schema for {}: {}", content_type, e);
                    format!("Schéma: {}", UNFORMATTABLE_SCHEMA)
                }
            },
        };
        lines.push(format!("{}  {}", pad, schema_line));
    }

    lines
}

/// Pretty-print with `indent` spaces per level, matching the nesting depth of the block
fn to_indented_json(value: &Value, indent: usize) -> serde_json::Result<String> {
    let pad = " ".repeat(indent);
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn format_schema(name: &str, raw: &Value) -> FormattedDocument {
    debug!("Formatting schema {}", name);

    let metadata = DocumentMetadata::SchemaDefinition {
        schema_name: name.to_string(),
    };

    let schema: SchemaObject = match serde_json::from_value(raw.clone()) {
        Ok(schema) => schema,
        Err(e) => {
            warn!("Could not parse schema {}: {}", name, e);
            let lines = vec![
                format!("Definícia schémy (modelu): {}", name),
                format!("Typ: {}", NOT_AVAILABLE),
                "Schéma: (nepodarilo sa naformátovať definíciu)".to_string(),
                String::new(),
                DOCUMENT_SEPARATOR.to_string(),
            ];
            return FormattedDocument {
                text: finish(lines),
                metadata,
            };
        }
    };

    let mut lines = vec![
        format!("Definícia schémy (modelu): {}", name),
        format!(
            "Typ: {}",
            schema
                .schema_type
                .as_ref()
                .map_or_else(|| NOT_AVAILABLE.to_string(), type_name)
        ),
    ];

    if let Some(description) = &schema.description {
        lines.push(format!("Popis: {}", description));
    }

    let required = schema.required.as_deref().unwrap_or_default();
    // the header follows the key, so an empty `properties` object still shows it
    if raw.get("properties").is_some() {
        lines.push("Vlastnosti (Properties):".to_string());
        for (property_name, property) in &schema.properties {
            lines.push(format_property(
                property_name,
                property,
                required.iter().any(|r| r == property_name),
            ));
        }
    }

    if let Some(required) = &schema.required {
        lines.push(format!("Povinné vlastnosti: {}", required.join(", ")));
    }

    lines.push(String::new());
    lines.push(DOCUMENT_SEPARATOR.to_string());

    FormattedDocument {
        text: finish(lines),
        metadata,
    }
}

/// Render a single schema property line
#[inline]
pub fn format_property(name: &str, raw: &Value, required: bool) -> String {
    let property: SchemaObject = match serde_json::from_value(raw.clone()) {
        Ok(property) => property,
        Err(e) => {
            warn!("Could not parse property {}: {}", name, e);
            return format!(
                "  - {} (typ: {}) (nepodarilo sa naformátovať vlastnosť) (povinná: {})",
                name,
                NOT_AVAILABLE,
                yes_no(required)
            );
        }
    };

    let mut parts = vec![format!("  - {} (typ: {})", name, property_type(&property))];
    if let Some(description) = &property.description {
        parts.push(format!(": {}", description));
    }
    if let Some(format) = &property.format {
        parts.push(format!(" (formát: {})", render_scalar(format)));
    }
    if let Some(values) = &property.enum_values {
        parts.push(format!(
            " (možné hodnoty: {})",
            values.iter().map(render_scalar).join(", ")
        ));
    }
    if let Some(example) = &property.example {
        parts.push(format!(" (príklad: {})", render_scalar(example)));
    }
    parts.push(format!(" (povinná: {})", yes_no(required)));

    parts.concat()
}

/// Resolve the displayed type of a property: a reference, an array of references,
/// an array of primitives, or the declared type
#[inline]
pub fn property_type(property: &SchemaObject) -> String {
    if let Some(reference) = &property.reference {
        return format!("referencia na `{}`", reference_name(reference));
    }

    if let Some(items) = &property.items {
        if let Some(reference) = items.get("$ref").and_then(Value::as_str) {
            return format!("pole referencií na `{}`", reference_name(reference));
        }
        if let Some(item_type) = items.get("type") {
            return format!("pole typu `{}`", type_name(item_type));
        }
    }

    property
        .schema_type
        .as_ref()
        .map_or_else(|| NOT_AVAILABLE.to_string(), type_name)
}

/// `type` is a string in OpenAPI 3.0 and may be a list of strings in 3.1
fn type_name(value: &Value) -> String {
    match value {
        Value::Array(types) => types.iter().map(render_scalar).join(" | "),
        other => render_scalar(other),
    }
}

/// Strings are rendered verbatim, everything else as compact JSON
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "Áno" } else { "Nie" }
}

fn finish(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
