mod iris;
mod loader;
mod registry;
mod types;

pub use iris::IrisModel;
pub use loader::{ModelCatalog, ModelFactory};
pub use registry::ModelManager;
pub use types::{MlModel, ModelDetails, ModelMetadata, ModelSpec};
