use std::net::SocketAddr;

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Code, transport::Channel};

use model_grpc_service::{
    ModelManager, build_router,
    config::default_models,
    grpc::{
        Empty, IrisModelInput, ModelMetadataRequest, model_service_client::ModelServiceClient,
    },
};

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(manager: ModelManager) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            build_router(manager)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn client(&self) -> ModelServiceClient<Channel> {
        ModelServiceClient::connect(format!("http://{}", self.addr))
            .await
            .unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        self.handle.await.unwrap();
    }
}

fn loaded_manager() -> ModelManager {
    let manager = ModelManager::new();
    manager.load_models(&default_models()).unwrap();
    manager
}

#[tokio::test]
async fn serves_iris_predictions() {
    let server = TestServer::start(loaded_manager()).await;
    let mut client = server.client().await;

    let response = client
        .iris_model_predict(IrisModelInput {
            sepal_length: 1.1,
            sepal_width: 1.2,
            petal_length: 1.3,
            petal_width: 1.4,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.species, "setosa");

    server.stop().await;
}

#[tokio::test]
async fn lists_models_and_metadata() {
    let server = TestServer::start(loaded_manager()).await;
    let mut client = server.client().await;

    let models = client.get_models(Empty {}).await.unwrap().into_inner();
    let names: Vec<_> = models.models.iter().map(|m| m.qualified_name.as_str()).collect();
    assert_eq!(names, ["iris_model"]);

    let metadata = client
        .get_model_metadata(ModelMetadataRequest {
            qualified_name: "iris_model".into(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(metadata.display_name, "Iris Model");
    assert!(metadata.output_schema.contains("species"));

    server.stop().await;
}

#[tokio::test]
async fn unknown_model_metadata_is_not_found() {
    let server = TestServer::start(loaded_manager()).await;
    let mut client = server.client().await;

    let status = client
        .get_model_metadata(ModelMetadataRequest {
            qualified_name: "asdf".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), "'asdf' not found in ModelManager instance.");

    server.stop().await;
}

#[tokio::test]
async fn predict_on_empty_registry_is_not_found() {
    let server = TestServer::start(ModelManager::new()).await;
    let mut client = server.client().await;

    let status = client
        .iris_model_predict(IrisModelInput::default())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    let models = client.get_models(Empty {}).await.unwrap().into_inner();
    assert!(models.models.is_empty());

    server.stop().await;
}
