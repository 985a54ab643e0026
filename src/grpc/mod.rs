//! Protobuf messages and tonic bindings for `proto/model_service.proto`.

#[allow(clippy::all)]
mod model_service;

pub use model_service::*;
