//! Hosts one model behind a typed request/response pair.
//!
//! The request message is flattened into a JSON object keyed by proto field
//! name, handed to the model's `predict`, and the prediction is mapped back
//! onto the response message by field name.

use std::{fmt, marker::PhantomData, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::task;
use tracing::{debug, info};

use crate::{
    error::ServiceError,
    model::{MlModel, ModelManager},
};

pub struct MlModelEndpoint<I, O> {
    model: Arc<dyn MlModel>,
    _messages: PhantomData<fn(I) -> O>,
}

impl<I, O> MlModelEndpoint<I, O>
where
    I: Serialize,
    O: DeserializeOwned,
{
    pub fn new(manager: &ModelManager, qualified_name: &str) -> Result<Self, ServiceError> {
        let model = manager
            .get_model(qualified_name)
            .ok_or_else(|| ServiceError::ModelNotFound(qualified_name.to_string()))?;

        info!("Initializing endpoint for model: {}", model.qualified_name());

        Ok(Self {
            model,
            _messages: PhantomData,
        })
    }

    pub fn qualified_name(&self) -> &str {
        self.model.qualified_name()
    }

    pub async fn call(&self, request: I) -> Result<O, ServiceError> {
        let data = to_keyword_arguments(&request)?;
        debug!(model = self.model.qualified_name(), %data, "running prediction");

        let model = self.model.clone();
        let prediction = task::spawn_blocking(move || model.predict(data))
            .await
            .map_err(|err| ServiceError::Inference(format!("prediction task failed: {err}")))??;

        from_prediction(prediction)
    }
}

impl<I, O> fmt::Debug for MlModelEndpoint<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MlModelEndpoint")
            .field("model", &self.model.qualified_name())
            .finish()
    }
}

fn to_keyword_arguments<I: Serialize>(request: &I) -> Result<Value, ServiceError> {
    let value =
        serde_json::to_value(request).map_err(|e| ServiceError::BadRequest(e.to_string()))?;
    if !value.is_object() {
        return Err(ServiceError::BadRequest(
            "request message must map to an object".into(),
        ));
    }
    Ok(value)
}

fn from_prediction<O: DeserializeOwned>(prediction: Value) -> Result<O, ServiceError> {
    serde_json::from_value(prediction).map_err(|e| {
        ServiceError::Schema(format!("prediction does not match the output message: {e}"))
    })
}
