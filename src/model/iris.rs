use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{error::ServiceError, model::MlModel};

// Per-class means of the iris dataset, in input field order.
const CENTROIDS: [(&str, [f64; 4]); 3] = [
    ("setosa", [5.006, 3.428, 1.462, 0.246]),
    ("versicolor", [5.936, 2.770, 4.260, 1.326]),
    ("virginica", [6.588, 2.974, 5.552, 2.026]),
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IrisInput {
    sepal_length: f64,
    sepal_width: f64,
    petal_length: f64,
    petal_width: f64,
}

#[derive(Debug, Serialize)]
struct IrisOutput {
    species: &'static str,
}

/// Nearest-centroid iris classifier.
#[derive(Debug, Default)]
pub struct IrisModel;

impl IrisModel {
    pub fn new() -> Self {
        Self
    }

    fn classify(input: &IrisInput) -> &'static str {
        let features = [
            input.sepal_length,
            input.sepal_width,
            input.petal_length,
            input.petal_width,
        ];
        CENTROIDS
            .iter()
            .map(|(species, centroid)| {
                let distance: f64 = features
                    .iter()
                    .zip(centroid)
                    .map(|(x, c)| (x - c).powi(2))
                    .sum();
                (*species, distance)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(species, _)| species)
            .unwrap_or(CENTROIDS[0].0)
    }
}

impl MlModel for IrisModel {
    fn qualified_name(&self) -> &str {
        "iris_model"
    }

    fn display_name(&self) -> &str {
        "Iris Model"
    }

    fn description(&self) -> &str {
        "A model to predict the species of a flower based on its measurements."
    }

    fn major_version(&self) -> u32 {
        0
    }

    fn minor_version(&self) -> u32 {
        1
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sepal_length": {"type": "number"},
                "sepal_width": {"type": "number"},
                "petal_length": {"type": "number"},
                "petal_width": {"type": "number"}
            },
            "required": ["sepal_length", "sepal_width", "petal_length", "petal_width"]
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "species": {"type": "string"}
            },
            "required": ["species"]
        })
    }

    fn predict(&self, data: Value) -> Result<Value, ServiceError> {
        let input: IrisInput =
            serde_json::from_value(data).map_err(|e| ServiceError::Schema(e.to_string()))?;
        if [
            input.sepal_length,
            input.sepal_width,
            input.petal_length,
            input.petal_width,
        ]
        .iter()
        .any(|v| !v.is_finite())
        {
            return Err(ServiceError::Schema("measurements must be finite".into()));
        }

        let output = IrisOutput {
            species: Self::classify(&input),
        };
        serde_json::to_value(output).map_err(|e| ServiceError::Inference(e.to_string()))
    }
}
