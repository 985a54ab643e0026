use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use model_grpc_service::{
    AppConfig, ModelManager,
    grpc::{Empty, IrisModelInput, model_service_client::ModelServiceClient},
    proto_gen::render_proto,
    serve,
};

#[derive(Parser, Debug)]
#[command(name = "model_grpc_service")]
#[command(author, version, about = "Serve machine learning models over gRPC")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the configured models and start the gRPC server (default)
    Serve,

    /// Write the protobuf definition for the configured models
    GenerateProto {
        /// Location of output .proto file
        #[arg(long)]
        output_file: PathBuf,
    },

    /// List the models hosted by a running server
    Models {
        #[arg(long, default_value = "http://127.0.0.1:50051")]
        address: String,
    },

    /// Call iris_model_predict on a running server
    Predict {
        #[arg(long, default_value = "http://127.0.0.1:50051")]
        address: String,
        #[arg(long)]
        sepal_length: f32,
        #[arg(long)]
        sepal_width: f32,
        #[arg(long)]
        petal_length: f32,
        #[arg(long)]
        petal_width: f32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = AppConfig::from_env()?;
            tracing::info!(
                environment = ?config.environment,
                models = config.models.len(),
                models_config = ?config.models_config_path,
                "loading models"
            );

            let manager = ModelManager::global();
            manager.load_models(&config.models)?;

            serve(&config, manager, shutdown_signal()).await?;
        }
        Commands::GenerateProto { output_file } => {
            let config = AppConfig::from_env()?;
            let manager = ModelManager::global();
            manager.load_models(&config.models)?;

            let proto = render_proto(&manager)?;
            fs::write(&output_file, proto)?;
            tracing::info!(path = %output_file.display(), "wrote protobuf definition");
        }
        Commands::Models { address } => {
            let mut client = ModelServiceClient::connect(address).await?;
            let response = client.get_models(Empty {}).await?.into_inner();
            for model in response.models {
                println!(
                    "{} ({}.{}): {}",
                    model.qualified_name, model.major_version, model.minor_version, model.description
                );
            }
        }
        Commands::Predict {
            address,
            sepal_length,
            sepal_width,
            petal_length,
            petal_width,
        } => {
            let mut client = ModelServiceClient::connect(address).await?;
            let response = client
                .iris_model_predict(IrisModelInput {
                    sepal_length,
                    sepal_width,
                    petal_length,
                    petal_width,
                })
                .await?
                .into_inner();
            println!("{response:?}");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,h2=warn,tower=warn".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
