use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    error::ServiceError,
    model::{IrisModel, MlModel, ModelSpec},
};

pub type ModelFactory = Arc<dyn Fn() -> Result<Arc<dyn MlModel>, ServiceError> + Send + Sync>;

/// Maps `(module_name, class_name)` pairs from configuration to model
/// constructors.
#[derive(Clone, Default)]
pub struct ModelCatalog {
    modules: HashMap<String, HashMap<String, ModelFactory>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the models compiled into this binary.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register("iris_model.iris_predict", "IrisModel", || {
            Ok(Arc::new(IrisModel::new()) as Arc<dyn MlModel>)
        });
        catalog
    }

    pub fn register<F>(&mut self, module_name: &str, class_name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn MlModel>, ServiceError> + Send + Sync + 'static,
    {
        self.modules
            .entry(module_name.to_string())
            .or_default()
            .insert(class_name.to_string(), Arc::new(factory));
        self
    }

    pub fn instantiate(&self, spec: &ModelSpec) -> Result<Arc<dyn MlModel>, ServiceError> {
        let classes = self.modules.get(&spec.module_name).ok_or_else(|| {
            ServiceError::ModelImport(format!("no module named '{}'", spec.module_name))
        })?;
        let factory = classes.get(&spec.class_name).ok_or_else(|| {
            ServiceError::ModelImport(format!(
                "module '{}' has no class '{}'",
                spec.module_name, spec.class_name
            ))
        })?;
        factory()
    }
}

impl fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(module, classes)| classes.keys().map(move |c| format!("{module}.{c}")))
            .collect();
        entries.sort();
        f.debug_struct("ModelCatalog").field("classes", &entries).finish()
    }
}
