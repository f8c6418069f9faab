//! Typed configuration: TOML schema, file loader, `${ENV_VAR}` substitution.

mod env_subst;
mod loader;
mod schema;

pub use {
    env_subst::substitute_env,
    loader::{discover_and_load, load_config},
    schema::{
        DedupConfig, IdentityConfig, McpConfig, ServerConfig, WhatsAppConfig, ZapgateConfig,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
