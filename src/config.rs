use std::{
    env, fs,
    net::{Ipv6Addr, SocketAddr},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{error::ServiceError, model::ModelSpec};

/// Deployment environment, selected with `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Beta,
    Prod,
}

impl Environment {
    // all environments currently share the same port
    fn default_listen_addr(self) -> SocketAddr {
        SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 50051)
    }
}

impl FromStr for Environment {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "beta" => Ok(Environment::Beta),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(ServiceError::Config(format!("unknown APP_ENV '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub listen_addr: SocketAddr,
    pub models: Vec<ModelSpec>,
    pub models_config_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::Dev,
        };

        let listen_addr = match lookup("SERVICE_ADDR") {
            Some(raw) => raw.parse().map_err(|e| {
                ServiceError::Config(format!("invalid SERVICE_ADDR '{raw}': {e}"))
            })?,
            None => environment.default_listen_addr(),
        };

        let models_config_path = lookup("MODELS_CONFIG_PATH").map(PathBuf::from);
        let models = match models_config_path.as_ref() {
            Some(path) => load_model_specs(path)?,
            None => default_models(),
        };

        Ok(Self {
            environment,
            listen_addr,
            models,
            models_config_path,
        })
    }
}

pub fn default_models() -> Vec<ModelSpec> {
    vec![ModelSpec::new("iris_model.iris_predict", "IrisModel")]
}

pub fn load_model_specs(path: &Path) -> Result<Vec<ModelSpec>, ServiceError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        ServiceError::Config(format!("invalid models file {}: {e}", path.display()))
    })
}
