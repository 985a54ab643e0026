pub mod config;
pub mod endpoint;
pub mod error;
pub mod grpc;
pub mod model;
pub mod proto_gen;
pub mod server;

pub use config::AppConfig;
pub use endpoint::MlModelEndpoint;
pub use error::ServiceError;
pub use model::{MlModel, ModelCatalog, ModelManager, ModelSpec};
pub use server::{ModelGrpcService, build_router, serve};
