use std::future::Future;

use async_trait::async_trait;
use tonic::{
    Request, Response, Status,
    transport::{Server, server::Router},
};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    endpoint::MlModelEndpoint,
    error::ServiceError,
    grpc::{
        Empty, IrisModelInput, IrisModelOutput, Model, ModelCollection, ModelMetadata,
        ModelMetadataRequest,
        model_service_server::{ModelService, ModelServiceServer},
    },
    model::{self, ModelManager},
};

const IRIS_MODEL: &str = "iris_model";

type IrisEndpoint = MlModelEndpoint<IrisModelInput, IrisModelOutput>;

pub struct ModelGrpcService {
    manager: ModelManager,
    iris: Option<IrisEndpoint>,
}

impl ModelGrpcService {
    /// Creates endpoints for every loaded model that has protobuf bindings.
    pub fn new(manager: ModelManager) -> Self {
        let iris = match IrisEndpoint::new(&manager, IRIS_MODEL) {
            Ok(endpoint) => Some(endpoint),
            Err(err) => {
                warn!(%err, "iris_model_predict will be unavailable");
                None
            }
        };
        Self { manager, iris }
    }
}

#[async_trait]
impl ModelService for ModelGrpcService {
    async fn get_models(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<ModelCollection>, Status> {
        let models = self
            .manager
            .get_models()
            .into_iter()
            .map(Model::from)
            .collect();
        Ok(Response::new(ModelCollection { models }))
    }

    async fn get_model_metadata(
        &self,
        request: Request<ModelMetadataRequest>,
    ) -> Result<Response<ModelMetadata>, Status> {
        let qualified_name = request.into_inner().qualified_name;
        let metadata = self
            .manager
            .get_model_metadata(&qualified_name)
            .ok_or(ServiceError::ModelNotFound(qualified_name))?;
        Ok(Response::new(ModelMetadata::from(metadata)))
    }

    async fn iris_model_predict(
        &self,
        request: Request<IrisModelInput>,
    ) -> Result<Response<IrisModelOutput>, Status> {
        let endpoint = self
            .iris
            .as_ref()
            .ok_or_else(|| ServiceError::ModelNotFound(IRIS_MODEL.to_string()))?;
        let output = endpoint.call(request.into_inner()).await?;
        Ok(Response::new(output))
    }
}

impl From<model::ModelDetails> for Model {
    fn from(details: model::ModelDetails) -> Self {
        Model {
            qualified_name: details.qualified_name,
            display_name: details.display_name,
            description: details.description,
            major_version: wire_version(details.major_version),
            minor_version: wire_version(details.minor_version),
        }
    }
}

impl From<model::ModelMetadata> for ModelMetadata {
    fn from(metadata: model::ModelMetadata) -> Self {
        let details = metadata.details;
        ModelMetadata {
            qualified_name: details.qualified_name,
            display_name: details.display_name,
            description: details.description,
            major_version: wire_version(details.major_version),
            minor_version: wire_version(details.minor_version),
            input_schema: metadata.input_schema.to_string(),
            output_schema: metadata.output_schema.to_string(),
        }
    }
}

fn wire_version(version: u32) -> i32 {
    i32::try_from(version).unwrap_or(i32::MAX)
}

pub fn build_router(manager: ModelManager) -> Router {
    Server::builder()
        .trace_fn(|req| tracing::info_span!("grpc", path = %req.uri().path()))
        .add_service(ModelServiceServer::new(ModelGrpcService::new(manager)))
}

pub async fn serve<F>(
    config: &AppConfig,
    manager: ModelManager,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()>,
{
    let addr = config.listen_addr;
    info!(%addr, models = manager.len(), "gRPC server ready");
    build_router(manager)
        .serve_with_shutdown(addr, shutdown)
        .await?;
    info!("gRPC server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, time::Duration};

    use tokio::sync::oneshot;
    use tonic::Code;

    use super::*;
    use crate::{config::default_models, grpc::model_service_client::ModelServiceClient};

    fn service() -> ModelGrpcService {
        let manager = ModelManager::new();
        manager.load_models(&default_models()).unwrap();
        ModelGrpcService::new(manager)
    }

    #[tokio::test]
    async fn lists_loaded_models() {
        let response = service()
            .get_models(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.models.len(), 1);
        assert_eq!(response.models[0].qualified_name, "iris_model");
        assert_eq!(response.models[0].minor_version, 1);
    }

    #[tokio::test]
    async fn metadata_carries_json_schemas() {
        let metadata = service()
            .get_model_metadata(Request::new(ModelMetadataRequest {
                qualified_name: "iris_model".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        let schema: serde_json::Value = serde_json::from_str(&metadata.input_schema).unwrap();
        assert_eq!(schema["properties"]["petal_width"]["type"], "number");
    }

    #[tokio::test]
    async fn metadata_for_unknown_model_is_not_found() {
        let status = service()
            .get_model_metadata(Request::new(ModelMetadataRequest {
                qualified_name: "asdf".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "'asdf' not found in ModelManager instance.");
    }

    #[tokio::test]
    async fn predicts_iris_species() {
        let output = service()
            .iris_model_predict(Request::new(IrisModelInput {
                sepal_length: 6.5,
                sepal_width: 3.0,
                petal_length: 5.5,
                petal_width: 2.0,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(output.species, "virginica");
    }

    #[tokio::test]
    async fn predict_without_loaded_model_is_not_found() {
        let status = ModelGrpcService::new(ModelManager::new())
            .iris_model_predict(Request::new(IrisModelInput::default()))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn serve_runs_until_shutdown_fires() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = AppConfig::from_lookup(|key| {
            (key == "SERVICE_ADDR").then(|| format!("127.0.0.1:{port}"))
        })
        .unwrap();
        let manager = ModelManager::new();
        manager.load_models(&config.models).unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            serve(&config, manager, async {
                rx.await.ok();
            })
            .await
        });

        let mut client = None;
        for _ in 0..50 {
            match ModelServiceClient::connect(format!("http://127.0.0.1:{port}")).await {
                Ok(connected) => {
                    client = Some(connected);
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        let mut client = client.expect("server never accepted connections");
        let models = client.get_models(Empty {}).await.unwrap().into_inner();
        assert_eq!(models.models.len(), 1);
        drop(client);

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("serve did not stop after shutdown")
            .unwrap();
        assert!(matches!(result, Ok(())));
    }
}
