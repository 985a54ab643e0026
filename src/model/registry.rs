use std::{fmt, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::info;

use crate::{
    error::ServiceError,
    model::{MlModel, ModelCatalog, ModelDetails, ModelMetadata, ModelSpec},
};

static GLOBAL: Lazy<ModelManager> = Lazy::new(ModelManager::new);

/// Holds the model objects hosted by the service.
///
/// Clones share the same model list, so a handle can be passed to every
/// endpoint while loading happens once at startup.
#[derive(Clone)]
pub struct ModelManager {
    catalog: Arc<ModelCatalog>,
    models: Arc<RwLock<Vec<Arc<dyn MlModel>>>>,
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .models
            .read()
            .iter()
            .map(|m| m.qualified_name().to_string())
            .collect();
        f.debug_struct("ModelManager")
            .field("catalog", &self.catalog)
            .field("models", &names)
            .finish()
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    pub fn new() -> Self {
        Self::with_catalog(ModelCatalog::builtin())
    }

    pub fn with_catalog(catalog: ModelCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            models: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Process-wide instance used by the binary.
    pub fn global() -> ModelManager {
        GLOBAL.clone()
    }

    /// Instantiates every configured model. Either all models of the call are
    /// added or none are.
    pub fn load_models(&self, configuration: &[ModelSpec]) -> Result<(), ServiceError> {
        let mut loaded: Vec<Arc<dyn MlModel>> = Vec::with_capacity(configuration.len());
        for spec in configuration {
            let model = self.catalog.instantiate(spec)?;
            if loaded
                .iter()
                .any(|m| m.qualified_name() == model.qualified_name())
            {
                return Err(ServiceError::DuplicateModel(
                    model.qualified_name().to_string(),
                ));
            }
            loaded.push(model);
        }

        let mut models = self.models.write();
        if let Some(dup) = loaded.iter().find(|new| {
            models
                .iter()
                .any(|existing| existing.qualified_name() == new.qualified_name())
        }) {
            return Err(ServiceError::DuplicateModel(dup.qualified_name().to_string()));
        }

        for model in loaded {
            info!(
                qualified_name = model.qualified_name(),
                version = %format!("{}.{}", model.major_version(), model.minor_version()),
                "loaded model"
            );
            models.push(model);
        }
        Ok(())
    }

    pub fn get_models(&self) -> Vec<ModelDetails> {
        self.models
            .read()
            .iter()
            .map(|model| ModelDetails::of(model.as_ref()))
            .collect()
    }

    pub fn get_model_metadata(&self, qualified_name: &str) -> Option<ModelMetadata> {
        self.get_model(qualified_name)
            .map(|model| ModelMetadata::of(model.as_ref()))
    }

    pub fn get_model(&self, qualified_name: &str) -> Option<Arc<dyn MlModel>> {
        self.models
            .read()
            .iter()
            .find(|model| model.qualified_name() == qualified_name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}
