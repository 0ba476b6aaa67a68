//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    config::{ColorizerConfig, ColorizerConfigBuilder},
    models::ModelArtifacts,
    utils::ExecutionProviderManager,
};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `ColorizerConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Layer the command-line flags over the config file and `COLORIT_*` variables
    pub(crate) fn from_cli(cli: &Cli) -> Result<ColorizerConfig> {
        Self::from_cli_with(cli, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_cli_with<F>(cli: &Cli, lookup: F) -> Result<ColorizerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = ColorizerConfig::resolve_with(cli.config.as_deref(), lookup)
            .context("Failed to resolve configuration")?;
        let mut builder = ColorizerConfigBuilder::from_config(base);

        if let Some(dir) = &cli.model_dir {
            builder = builder.artifacts(ModelArtifacts::in_dir(dir));
        }
        if let Some(model) = &cli.model {
            builder = builder.model_path(model);
        }
        if let Some(points) = &cli.points {
            builder = builder.points_path(points);
        }

        if let Some(provider) = &cli.execution_provider {
            let (backend_type, execution_provider) =
                ExecutionProviderManager::parse_provider_string(provider)
                    .context("Invalid execution provider format")?;
            builder = builder
                .backend_type(backend_type)
                .execution_provider(execution_provider);
        }

        if let Some(quality) = cli.jpeg_quality {
            builder = builder.jpeg_quality(quality);
        }
        if let Some(format) = cli.format {
            builder = builder.output_format(format.into());
        }
        if let Some(threads) = cli.threads {
            // Same count for intra and inter operations
            builder = builder.intra_threads(threads).inter_threads(threads);
        }

        builder
            .debug(cli.verbose >= 2)
            .build()
            .context("Invalid configuration")
    }
}
