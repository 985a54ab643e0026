//! Renders the protobuf definition of the service from the schemas of the
//! loaded models.

use serde_json::Value;

use crate::{
    error::ServiceError,
    model::{ModelManager, ModelMetadata},
};

pub const PROTO_PACKAGE: &str = "model_service";

const NULL_VALUE: &str = "google.protobuf.NullValue";

const STRUCT_IMPORT: &str = "google/protobuf/struct.proto";

const REGISTRY_RPCS: &str = "  rpc get_models (empty) returns (model_collection) {}
  rpc get_model_metadata (model_metadata_request) returns (model_metadata) {}
";

const REGISTRY_MESSAGES: &str = "message empty {}

message model {
  string qualified_name = 1;
  string display_name = 2;
  string description = 3;
  int32 major_version = 4;
  int32 minor_version = 5;
}

message model_collection {
  repeated model models = 1;
}

message model_metadata_request {
  string qualified_name = 1;
}

message model_metadata {
  string qualified_name = 1;
  string display_name = 2;
  string description = 3;
  int32 major_version = 4;
  int32 minor_version = 5;
  string input_schema = 6;
  string output_schema = 7;
}
";

/// Maps a JSON Schema type name to its protobuf scalar.
pub fn proto_type(schema_type: &str) -> Option<&'static str> {
    match schema_type {
        "string" => Some("string"),
        "number" => Some("float"),
        "integer" => Some("int64"),
        "boolean" => Some("bool"),
        "null" => Some(NULL_VALUE),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoField {
    pub index: usize,
    pub name: String,
    pub proto_type: &'static str,
}

/// Lists the fields of a JSON Schema object in declaration order, numbered
/// from 1.
pub fn schema_fields(schema: &Value) -> Result<Vec<ProtoField>, ServiceError> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    properties
        .iter()
        .enumerate()
        .map(|(idx, (name, property))| {
            let schema_type = property
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| ServiceError::Schema(format!("field '{name}' has no type")))?;
            let proto_type = proto_type(schema_type).ok_or_else(|| {
                ServiceError::Schema(format!(
                    "field '{name}' has unsupported type '{schema_type}'"
                ))
            })?;
            Ok(ProtoField {
                index: idx + 1,
                name: name.clone(),
                proto_type,
            })
        })
        .collect()
}

pub fn render_proto(manager: &ModelManager) -> Result<String, ServiceError> {
    let models: Vec<ModelMetadata> = manager
        .get_models()
        .iter()
        .filter_map(|details| manager.get_model_metadata(&details.qualified_name))
        .collect();

    let mut messages = String::new();
    let mut uses_null = false;
    for model in &models {
        let name = &model.details.qualified_name;
        for (suffix, schema) in [("input", &model.input_schema), ("output", &model.output_schema)] {
            let fields = schema_fields(schema)?;
            uses_null |= fields.iter().any(|f| f.proto_type == NULL_VALUE);
            messages.push_str(&render_message(&format!("{name}_{suffix}"), &fields));
        }
    }

    let mut out = String::from("syntax = \"proto3\";\n\n");
    out.push_str(&format!("package {PROTO_PACKAGE};\n\n"));
    if uses_null {
        out.push_str(&format!("import \"{STRUCT_IMPORT}\";\n\n"));
    }
    out.push_str("service ModelService {\n");
    out.push_str(REGISTRY_RPCS);
    for model in &models {
        let name = &model.details.qualified_name;
        out.push_str(&format!(
            "  rpc {name}_predict ({name}_input) returns ({name}_output) {{}}\n"
        ));
    }
    out.push_str("}\n\n");
    out.push_str(REGISTRY_MESSAGES);
    out.push_str(&messages);
    Ok(out)
}

fn render_message(name: &str, fields: &[ProtoField]) -> String {
    let mut out = format!("\nmessage {name} {{\n");
    for field in fields {
        out.push_str(&format!(
            "  {} {} = {};\n",
            field.proto_type, field.name, field.index
        ));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        config::default_models,
        model::{MlModel, ModelCatalog, ModelSpec},
    };

    #[test]
    fn maps_json_schema_types() {
        assert_eq!(proto_type("number"), Some("float"));
        assert_eq!(proto_type("integer"), Some("int64"));
        assert_eq!(proto_type("boolean"), Some("bool"));
        assert_eq!(proto_type("null"), Some("google.protobuf.NullValue"));
        assert_eq!(proto_type("array"), None);
    }

    #[test]
    fn numbers_fields_in_declaration_order() {
        let fields = schema_fields(&json!({
            "properties": {
                "zeta": {"type": "string"},
                "alpha": {"type": "integer"}
            }
        }))
        .unwrap();
        assert_eq!(
            fields,
            vec![
                ProtoField { index: 1, name: "zeta".into(), proto_type: "string" },
                ProtoField { index: 2, name: "alpha".into(), proto_type: "int64" },
            ]
        );
    }

    #[test]
    fn unsupported_type_is_schema_error() {
        let err = schema_fields(&json!({"properties": {"tags": {"type": "array"}}})).unwrap_err();
        assert!(matches!(err, ServiceError::Schema(_)));
    }

    #[test]
    fn builtin_models_render_checked_in_proto() {
        let manager = ModelManager::new();
        manager.load_models(&default_models()).unwrap();

        let rendered = render_proto(&manager).unwrap();
        assert_eq!(rendered, include_str!("../proto/model_service.proto"));
    }

    #[test]
    fn empty_manager_renders_registry_only() {
        let rendered = render_proto(&ModelManager::new()).unwrap();
        assert!(rendered.contains("package model_service;"));
        assert!(!rendered.contains("import"));
        assert!(rendered.contains("rpc get_models"));
        assert!(!rendered.contains("_predict"));
        assert!(rendered.ends_with("}\n"));
    }

    struct NullableModel;

    impl MlModel for NullableModel {
        fn qualified_name(&self) -> &str {
            "nullable"
        }
        fn display_name(&self) -> &str {
            "Nullable"
        }
        fn description(&self) -> &str {
            "has a null output field"
        }
        fn major_version(&self) -> u32 {
            1
        }
        fn minor_version(&self) -> u32 {
            0
        }
        fn input_schema(&self) -> Value {
            json!({"properties": {"count": {"type": "integer"}}})
        }
        fn output_schema(&self) -> Value {
            json!({"properties": {"flag": {"type": "boolean"}, "nothing": {"type": "null"}}})
        }
        fn predict(&self, _data: Value) -> Result<Value, ServiceError> {
            Ok(json!({"flag": true, "nothing": null}))
        }
    }

    #[test]
    fn null_fields_import_struct_proto() {
        let mut catalog = ModelCatalog::new();
        catalog.register("nullable", "NullableModel", || {
            Ok(Arc::new(NullableModel) as Arc<dyn MlModel>)
        });
        let manager = ModelManager::with_catalog(catalog);
        manager
            .load_models(&[ModelSpec::new("nullable", "NullableModel")])
            .unwrap();

        let rendered = render_proto(&manager).unwrap();
        assert!(rendered.contains(
            "package model_service;\n\nimport \"google/protobuf/struct.proto\";\n\nservice ModelService {"
        ));
        assert!(rendered.contains("  google.protobuf.NullValue nothing = 2;\n"));
        assert!(rendered.contains("message nullable_input {\n  int64 count = 1;\n}\n"));
        assert!(rendered.contains("rpc nullable_predict (nullable_input) returns (nullable_output) {}"));
    }
}
