use super::*;
use serde_json::json;

fn parse(json: &str) -> OpenApiDocument {
    json.parse().expect("fixture should parse")
}

fn products_api() -> OpenApiDocument {
    parse(
        r##"{
        "openapi": "3.0.1",
        "info": { "title": "Shop API", "version": "2.9", "description": "Internal shop API" },
        "servers": [
            { "url": "https://api.example.com", "description": "Production" },
            { "url": "https://staging.example.com" }
        ],
        "paths": {
            "/api/v1/products": {
                "get": {
                    "summary": "List products",
                    "tags": ["Products", "Catalog"],
                    "operationId": "listProducts",
                    "parameters": [
                        {
                            "name": "page",
                            "in": "query",
                            "description": "Page number",
                            "schema": { "type": "integer", "format": "int32", "default": 1 }
                        },
                        {
                            "name": "sort",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string", "enum": ["name", "price"] }
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "A page of products",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Product" }
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Product": {
                    "type": "object",
                    "description": "A product",
                    "properties": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" }
                    },
                    "required": ["id"]
                }
            }
        }
    }"##,
    )
}

fn operation_documents(documents: &[FormattedDocument]) -> Vec<&FormattedDocument> {
    documents
        .iter()
        .filter(|d| matches!(d.metadata, DocumentMetadata::Operation { .. }))
        .collect()
}

#[test]
fn emits_one_document_per_unit() {
    let documents = format_documents(&products_api());

    assert_eq!(documents.len(), 3);
    assert!(matches!(
        documents[0].metadata,
        DocumentMetadata::GeneralInfo { .. }
    ));
    assert!(matches!(
        documents[1].metadata,
        DocumentMetadata::Operation { .. }
    ));
    assert!(matches!(
        documents[2].metadata,
        DocumentMetadata::SchemaDefinition { .. }
    ));
}

#[test]
fn single_operation_contains_endpoint_line() {
    let documents = format_documents(&products_api());
    let operations = operation_documents(&documents);

    assert_eq!(operations.len(), 1);
    assert!(operations[0].text.contains("GET /api/v1/products"));
    assert!(
        operations[0]
            .text
            .starts_with("API Endpoint: GET /api/v1/products\n")
    );
}

#[test]
fn operation_metadata() {
    let documents = format_documents(&products_api());
    assert_eq!(
        documents[1].metadata,
        DocumentMetadata::Operation {
            path: "/api/v1/products".to_string(),
            method: HttpMethod::Get,
            summary: "List products".to_string(),
            tags: "Products, Catalog".to_string(),
        }
    );
    assert_eq!(documents[1].metadata.kind(), "operation");
    assert_eq!(documents[1].metadata.label(), "GET /api/v1/products");
}

#[test]
fn endpoint_line_round_trips_method_and_path() {
    let document = parse(
        r#"{ "paths": {
            "/a/{id}/b": { "patch": {}, "Delete": {} },
            "/with space": { "options": {} }
        } }"#,
    );
    let documents = format_documents(&document);

    let expected = [
        (HttpMethod::Patch, "/a/{id}/b"),
        (HttpMethod::Delete, "/a/{id}/b"),
        (HttpMethod::Options, "/with space"),
    ];
    let operations = operation_documents(&documents);
    assert_eq!(operations.len(), expected.len());

    for (doc, (method, path)) in operations.iter().zip(expected) {
        let endpoint = Endpoint::from_document_text(&doc.text).expect("endpoint line present");
        assert_eq!(endpoint.method, method);
        assert_eq!(endpoint.path, path);
    }
}

#[test]
fn empty_parameters_render_none_sentinel() {
    assert_eq!(format_parameters(&[]), vec!["  Žiadne.".to_string()]);

    let document = parse(r#"{ "paths": { "/x": { "get": { "parameters": [] } } } }"#);
    let documents = format_documents(&document);
    assert!(documents[1].text.contains("Parametre:\n  Žiadne.\n"));
}

#[test]
fn parameters_render_all_fields() {
    let documents = format_documents(&products_api());
    let text = &documents[1].text;

    assert!(text.contains("  - Meno: page\n"));
    assert!(text.contains("    Umiestnenie: query\n"));
    assert!(text.contains("    Dátový typ: integer\n"));
    assert!(text.contains("    Formát: int32\n"));
    assert!(text.contains("    Predvolená hodnota: 1\n"));
    assert!(text.contains("    Popis: Page number\n"));
    assert!(text.contains("    Možné hodnoty (enum): name, price\n"));
    assert!(text.contains("    Povinný: Áno\n"));
    assert!(text.contains("    Povinný: Nie\n"));
}

#[test]
fn parameter_without_schema_or_description() {
    let parameters: Vec<Parameter> =
        serde_json::from_value(json!([{ "name": "x", "in": "cookie" }])).expect("valid parameters");
    let lines = format_parameters(&parameters);

    assert_eq!(
        lines,
        vec![
            "  - Meno: x",
            "    Umiestnenie: cookie",
            "    Dátový typ: N/A",
            "    Popis: N/A",
            "    Povinný: Nie",
        ]
    );
}

#[test]
fn referenced_parameter_uses_reference_name() {
    let parameters: Vec<Parameter> =
        serde_json::from_value(json!([{ "$ref": "#/components/parameters/PageSize" }]))
            .expect("valid parameters");
    let lines = format_parameters(&parameters);
    assert_eq!(lines[0], "  - Meno: PageSize");
}

#[test]
fn missing_description_omits_line() {
    let document = parse(r#"{ "paths": { "/x": { "get": { "summary": "S" } } } }"#);
    let documents = format_documents(&document);
    let text = &documents[1].text;

    assert!(!text.contains("Popis:"));
    assert!(text.starts_with("API Endpoint: GET /x\nSúhrn: S\n\nParametre:\n"));
}

#[test]
fn present_description_is_rendered() {
    let document =
        parse(r#"{ "paths": { "/x": { "get": { "summary": "S", "description": "Long text" } } } }"#);
    let documents = format_documents(&document);
    assert!(
        documents[1]
            .text
            .starts_with("API Endpoint: GET /x\nSúhrn: S\nPopis: Long text\n\n")
    );
}

#[test]
fn missing_summary_renders_not_available() {
    let document = parse(r#"{ "paths": { "/x": { "post": {} } } }"#);
    let documents = format_documents(&document);
    assert!(documents[1].text.contains("Súhrn: N/A\n"));
    assert!(!documents[1].text.contains("Tagy:"));
    assert!(!documents[1].text.contains("Operation ID:"));
}

#[test]
fn request_body_sentinel_and_rendering() {
    assert_eq!(format_request_body(None), vec!["  Nie je definované."]);

    let body: RequestBody = serde_json::from_value(json!({
        "description": "New product",
        "required": true,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/ProductInput" } },
            "application/x-www-form-urlencoded": { "schema": { "type": "object" } }
        }
    }))
    .expect("valid request body");
    let text = format_request_body(Some(&body)).join("\n");

    assert!(text.contains("  Popis: New product"));
    assert!(text.contains("  Povinné: Áno"));
    assert!(text.contains("    - application/json:"));
    assert!(text.contains(
        "      Schéma: `ProductInput` (Odkazuje na definíciu v 'components/schemas')"
    ));
    assert!(text.contains("    - application/x-www-form-urlencoded:"));
    assert!(text.contains("Schéma: ```json\n{\n    \"type\": \"object\"\n}\n```"));
    assert!(!text.contains("components/schemas/ProductInput"));
}

#[test]
fn responses_sentinel_and_rendering() {
    assert_eq!(format_responses(&[]), vec!["  Nie sú definované."]);

    let documents = format_documents(&products_api());
    let text = &documents[1].text;
    assert!(text.contains("  - Status Kód: 200\n"));
    assert!(text.contains("    Popis: A page of products\n"));
    assert!(text.contains("      - application/json:\n"));
    assert!(
        text.contains("        Schéma: `Product` (Odkazuje na definíciu v 'components/schemas')\n")
    );
}

#[test]
fn inline_response_schema_uses_deeper_indent() {
    let responses = vec![(
        "200".to_string(),
        serde_json::from_value::<Response>(json!({
            "description": "Ok",
            "content": { "application/json": { "schema": { "type": "array", "items": { "type": "string" } } } }
        }))
        .expect("valid response"),
    )];
    let text = format_responses(&responses).join("\n");

    assert!(text.contains(
        "Schéma: ```json\n{\n      \"type\": \"array\",\n      \"items\": {\n            \"type\": \"string\"\n      }\n}\n```"
    ));
}

#[test]
fn response_without_description() {
    let responses = vec![("204".to_string(), Response::default())];
    assert_eq!(
        format_responses(&responses),
        vec!["  - Status Kód: 204", "    Popis: N/A"]
    );
}

#[test]
fn general_info_document() {
    let documents = format_documents(&products_api());
    assert_eq!(
        documents[0].text,
        "Názov API: Shop API\nVerzia API: 2.9\nPopis API: Internal shop API\nServery:\n  - URL: https://api.example.com, Popis: Production\n  - URL: https://staging.example.com, Popis: N/A\n"
    );
    assert_eq!(
        documents[0].metadata,
        DocumentMetadata::GeneralInfo {
            title: "Shop API".to_string()
        }
    );
}

#[test]
fn general_info_defaults() {
    let documents = format_documents(&OpenApiDocument::default());
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].text, "Názov API: API Dokumentácia\nVerzia API: \n");
}

#[test]
fn schema_lists_properties_and_required_flags() {
    let documents = format_documents(&products_api());
    let text = &documents[2].text;

    assert!(text.starts_with("Definícia schémy (modelu): Product\nTyp: object\nPopis: A product\n"));
    assert!(text.contains("  - id (typ: integer) (povinná: Áno)\n"));
    assert!(text.contains("  - name (typ: string) (povinná: Nie)\n"));
    assert!(text.contains("Povinné vlastnosti: id\n"));
    assert!(text.ends_with("\n---\n"));
    assert_eq!(
        documents[2].metadata,
        DocumentMetadata::SchemaDefinition {
            schema_name: "Product".to_string()
        }
    );
}

#[test]
fn property_type_resolution() {
    let parse_property = |value: serde_json::Value| -> SchemaObject {
        serde_json::from_value(value).expect("valid property")
    };

    assert_eq!(
        property_type(&parse_property(json!({ "$ref": "#/components/schemas/Category" }))),
        "referencia na `Category`"
    );
    assert_eq!(
        property_type(&parse_property(
            json!({ "type": "array", "items": { "$ref": "#/components/schemas/Tag" } })
        )),
        "pole referencií na `Tag`"
    );
    assert_eq!(
        property_type(&parse_property(json!({ "type": "array", "items": { "type": "string" } }))),
        "pole typu `string`"
    );
    assert_eq!(
        property_type(&parse_property(json!({ "type": ["string", "null"] }))),
        "string | null"
    );
    assert_eq!(property_type(&parse_property(json!({}))), "N/A");
}

#[test]
fn array_of_references_names_the_schema() {
    let line = format_property(
        "tags",
        &json!({ "type": "array", "items": { "$ref": "#/components/schemas/Tag" } }),
        false,
    );
    assert!(line.contains("Tag"));
    assert!(line.contains("pole referencií"));
}

#[test]
fn property_optional_fields() {
    let line = format_property(
        "status",
        &json!({
            "type": "string",
            "description": "Current status",
            "format": "slug",
            "enum": ["active", "archived", 3],
            "example": "active"
        }),
        true,
    );
    assert_eq!(
        line,
        "  - status (typ: string): Current status (formát: slug) (možné hodnoty: active, archived, 3) (príklad: active) (povinná: Áno)"
    );
}

#[test]
fn malformed_property_renders_placeholder() {
    let line = format_property("broken", &json!("not an object"), false);
    assert!(line.contains("nepodarilo sa naformátovať"));
    assert!(line.starts_with("  - broken"));
}

#[test]
fn malformed_schema_renders_placeholder_and_continues() {
    let document = parse(
        r#"{ "components": { "schemas": {
            "Broken": 42,
            "Fine": { "type": "string" }
        } } }"#,
    );
    let documents = format_documents(&document);

    assert_eq!(documents.len(), 3);
    assert!(documents[1].text.contains("Definícia schémy (modelu): Broken"));
    assert!(documents[1].text.contains("nepodarilo sa naformátovať"));
    assert!(documents[2].text.contains("Typ: string"));
}

#[test]
fn unusual_parameter_schema_only_degrades_that_parameter() {
    let document = parse(
        r#"{ "paths": {
            "/a": { "get": { "parameters": [
                { "name": "ids", "in": "query", "schema": { "type": "array", "items": true } },
                { "name": "mode", "in": "query", "schema": { "type": "string", "enum": "x" } }
            ] } },
            "/b": { "get": { "summary": "Fine" } }
        } }"#,
    );
    let documents = format_documents(&document);

    assert_eq!(documents.len(), 3);
    let a = &documents[1].text;
    assert!(a.contains("  - Meno: ids\n    Umiestnenie: query\n    Dátový typ: array\n    Popis: N/A"));
    assert!(a.contains(
        "  - Meno: mode\n    Umiestnenie: query\n    Dátový typ: string\n    Schéma: (nepodarilo sa naformátovať schému)\n"
    ));
    assert!(documents[2].text.starts_with("API Endpoint: GET /b\nSúhrn: Fine\n"));
}

#[test]
fn invalid_operation_fields_are_dropped_individually() {
    let document = parse(
        r#"{ "paths": { "/orders": {
            "parameters": [ "not a parameter", { "name": "shop", "in": "header" } ],
            "post": {
                "summary": "Create order",
                "tags": "orders",
                "parameters": [ { "name": "dry", "in": "query", "required": "yes" } ],
                "responses": {
                    "201": { "description": "Created" },
                    "400": { "description": 400 }
                }
            }
        } } }"#,
    );
    let documents = format_documents(&document);
    let text = &documents[1].text;

    assert!(text.starts_with("API Endpoint: POST /orders\nSúhrn: Create order\n"));
    assert!(!text.contains("Tagy:"));
    assert!(text.contains("  - Meno: shop"));
    assert!(!text.contains("  - Meno: dry"));
    assert!(text.contains("  - Status Kód: 201\n    Popis: Created"));
    assert!(!text.contains("Status Kód: 400"));
}

#[test]
fn schema_level_boolean_items_keeps_the_rest() {
    let document = parse(
        r#"{ "components": { "schemas": {
            "Tags": { "type": "array", "description": "Free tags", "items": true }
        } } }"#,
    );
    let text = &format_documents(&document)[1].text;

    assert!(text.starts_with("Definícia schémy (modelu): Tags\nTyp: array\nPopis: Free tags\n"));
    assert!(!text.contains("nepodarilo sa"));
}

#[test]
fn empty_properties_object_still_shows_header() {
    let document = parse(
        r#"{ "components": { "schemas": { "Empty": { "type": "object", "properties": {} } } } }"#,
    );
    let text = &format_documents(&document)[1].text;

    assert_eq!(
        text,
        "Definícia schémy (modelu): Empty\nTyp: object\nVlastnosti (Properties):\n\n---\n"
    );
}

#[test]
fn schema_without_properties_or_required() {
    let document = parse(r#"{ "components": { "schemas": { "Id": { "type": "string" } } } }"#);
    let documents = format_documents(&document);
    let text = &documents[1].text;

    assert!(!text.contains("Vlastnosti"));
    assert!(!text.contains("Povinné vlastnosti"));
    assert_eq!(text, "Definícia schémy (modelu): Id\nTyp: string\n\n---\n");
}

#[test]
fn metadata_serializes_with_type_tag() {
    let metadata = DocumentMetadata::Operation {
        path: "/x".to_string(),
        method: HttpMethod::Post,
        summary: String::new(),
        tags: String::new(),
    };
    let value = serde_json::to_value(&metadata).expect("metadata should serialize");
    assert_eq!(value["type"], "operation");
    assert_eq!(value["method"], "POST");

    let back: DocumentMetadata = serde_json::from_value(value).expect("metadata should parse");
    assert_eq!(back, metadata);
}
