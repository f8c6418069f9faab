use std::path::Path;

use tracing::{debug, warn};

use crate::{Error, Result, env_subst::substitute_env, schema::ZapgateConfig};

/// Default config file name, checked in the working directory.
const CONFIG_FILENAME: &str = "zapgate.toml";

/// Load config from the given TOML file, substituting `${ENV_VAR}`
/// placeholders in string values before parsing.
pub fn load_config(path: &Path) -> Result<ZapgateConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load from an explicit path when given, otherwise from `./zapgate.toml`
/// when present, otherwise defaults. A file that exists but fails to load
/// falls back to defaults with a warning rather than aborting startup.
pub fn discover_and_load(explicit: Option<&Path>) -> ZapgateConfig {
    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            let local = std::path::PathBuf::from(CONFIG_FILENAME);
            local.exists().then_some(local)
        });

    match candidate {
        Some(path) => match load_config(&path) {
            Ok(cfg) => {
                debug!(path = %path.display(), "loaded config");
                cfg
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ZapgateConfig::default()
            },
        },
        None => {
            debug!("no config file found, using defaults");
            ZapgateConfig::default()
        },
    }
}
