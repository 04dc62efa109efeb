use crate::config::{CliConfig, CONFIG_FILE};
use crate::error::Result;
use hotdev::{ConfigError, HotdevConfig};
use std::collections::BTreeSet;
use std::path::Path;

impl CliConfig {
    /// Validate the configuration, including the `hotdev` section.
    pub fn validate(&self) -> Result<()> {
        let session = self.session_config()?;

        match (&self.source, self.bundles.is_empty()) {
            (None, true) => {
                return Err(ConfigError::MissingField {
                    field: "source".to_string(),
                    hint: format!(
                        "Set \"source\" or list \"bundles\" in {}",
                        CONFIG_FILE
                    ),
                }
                .into());
            }
            (Some(source), false) => {
                return Err(ConfigError::InvalidValue {
                    field: "source".to_string(),
                    value: source.display().to_string(),
                    hint: "Use either \"source\" or \"bundles\", not both".to_string(),
                }
                .into());
            }
            _ => {}
        }

        if self.bundles.is_empty() {
            check_output_path("outputPath", &self.output_path)?;
        }

        let mut seen = BTreeSet::new();
        for (i, bundle) in self.bundles.iter().enumerate() {
            let field = format!("bundles[{}].outputPath", i);
            check_output_path(&field, &bundle.output_path)?;
            if !seen.insert(bundle.output_path.clone()) {
                return Err(ConfigError::InvalidValue {
                    field,
                    value: bundle.output_path.display().to_string(),
                    hint: "Each bundle needs its own output path".to_string(),
                }
                .into());
            }
        }

        session.validate()?;
        Ok(())
    }

    /// The `hotdev` section.
    pub fn session_config(&self) -> Result<HotdevConfig> {
        self.hotdev.clone().ok_or_else(|| {
            ConfigError::MissingSection {
                section: "hotdev".to_string(),
                hint: format!(
                    "Add a \"hotdev\" object to {} (\"hotdev\": {{}} uses the defaults)",
                    CONFIG_FILE
                ),
            }
            .into()
        })
    }
}

fn check_output_path(field: &str, path: &Path) -> Result<()> {
    if path.is_absolute() && !path.components().any(|c| c.as_os_str() == "..") {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        value: path.display().to_string(),
        hint: "Output paths are absolute directories in the in-memory store, e.g. \"/dist\""
            .to_string(),
    }
    .into())
}
