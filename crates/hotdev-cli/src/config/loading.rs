use crate::cli::DevArgs;
use crate::config::{CliConfig, CONFIG_FILE};
use crate::error::{CliError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use hotdev::ConfigError;
use std::path::{Path, PathBuf};

impl CliConfig {
    /// Load configuration for `hotdev dev`.
    ///
    /// Priority: flags > `HOTDEV_*` environment > config file > defaults.
    /// `--lazy` switches the session to lazy mode after extraction.
    pub fn load(args: &DevArgs) -> Result<Self> {
        let mut config = Self::load_with(args.config.as_deref(), args.port, args.cwd.as_deref())?;
        if args.lazy {
            if let Some(hotdev) = config.hotdev.as_mut() {
                hotdev.lazy = true;
            }
        }
        Ok(config)
    }

    /// Load configuration from an explicit or default config file, with
    /// optional `port` and `cwd` overrides.
    pub fn load_with(
        config_path: Option<&Path>,
        port: Option<u16>,
        cwd: Option<&Path>,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_file(config_path, cwd)? {
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Env::prefixed("HOTDEV_").only(&["port", "source", "cwd"]));

        if let Some(port) = port {
            figment = figment.merge(Serialized::default("port", port));
        }
        if let Some(cwd) = cwd {
            figment = figment.merge(Serialized::default("cwd", cwd));
        }

        figment.extract().map_err(|e| {
            CliError::Config(ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: format!("Check {} syntax and field types", CONFIG_FILE),
            })
        })
    }
}

/// An explicit path must exist; the default file is optional.
fn config_file(explicit: Option<&Path>, cwd: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(CliError::FileNotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let default_path = match cwd {
        Some(dir) => dir.join(CONFIG_FILE),
        None => PathBuf::from(CONFIG_FILE),
    };
    Ok(default_path.is_file().then_some(default_path))
}
