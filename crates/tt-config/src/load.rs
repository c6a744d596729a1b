//! Load, select, and validate the effective configuration.

use std::path::Path;

use crate::config::TypologyConfig;
use crate::preset::{get_preset, PresetName};
use crate::resolve::{resolve_config, ConfigPaths, ConfigSource};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_config, ValidationResult};

/// The effective configuration of a run plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TypologyConfig,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

impl LoadedConfig {
    /// Re-validate after command-line overrides and refresh the snapshot.
    pub fn revalidate(&mut self) -> ValidationResult<()> {
        validate_config(&self.config)?;
        self.snapshot = ConfigSnapshot::new(&self.config, &self.paths);
        Ok(())
    }
}

/// Load the effective configuration.
///
/// A preset, when given, replaces file discovery entirely. Otherwise the
/// resolved file is loaded, falling back to the built-in defaults. The
/// result is validated before it is returned.
pub fn load_config(
    cli_path: Option<&Path>,
    preset: Option<PresetName>,
) -> ValidationResult<LoadedConfig> {
    let (config, paths) = match preset {
        Some(name) => (
            get_preset(name),
            ConfigPaths {
                config: None,
                source: ConfigSource::Preset(name.as_str().to_string()),
            },
        ),
        None => {
            let paths = resolve_config(cli_path);
            let config = match &paths.config {
                Some(path) => TypologyConfig::from_file(path)?,
                None => TypologyConfig::default(),
            };
            (config, paths)
        }
    };

    validate_config(&config)?;
    let snapshot = ConfigSnapshot::new(&config, &paths);

    Ok(LoadedConfig {
        config,
        paths,
        snapshot,
    })
}
