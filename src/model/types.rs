use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;

/// A model that can be hosted by the service.
///
/// Schemas are JSON Schema objects; the order of `properties` is meaningful
/// because it fixes the field numbers of the generated protobuf messages.
pub trait MlModel: Send + Sync {
    fn qualified_name(&self) -> &str;
    fn display_name(&self) -> &str;
    fn description(&self) -> &str;
    fn major_version(&self) -> u32;
    fn minor_version(&self) -> u32;
    fn input_schema(&self) -> Value;
    fn output_schema(&self) -> Value;

    fn predict(&self, data: Value) -> Result<Value, ServiceError>;
}

/// One entry of the model configuration list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub module_name: String,
    pub class_name: String,
}

impl ModelSpec {
    pub fn new(module_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            class_name: class_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDetails {
    pub display_name: String,
    pub qualified_name: String,
    pub description: String,
    pub major_version: u32,
    pub minor_version: u32,
}

impl ModelDetails {
    pub fn of(model: &dyn MlModel) -> Self {
        Self {
            display_name: model.display_name().to_string(),
            qualified_name: model.qualified_name().to_string(),
            description: model.description().to_string(),
            major_version: model.major_version(),
            minor_version: model.minor_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub details: ModelDetails,
    pub input_schema: Value,
    pub output_schema: Value,
}

impl ModelMetadata {
    pub fn of(model: &dyn MlModel) -> Self {
        Self {
            details: ModelDetails::of(model),
            input_schema: model.input_schema(),
            output_schema: model.output_schema(),
        }
    }
}
