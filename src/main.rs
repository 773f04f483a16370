use anyhow::Context;
use clap::{Parser, Subcommand};
use ontext::config::CONFIG_FILE;
use ontext::io::ExitCode;
use ontext::{ClusterMethod, Driver, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ontext")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discovers and names binary relations between noun categories from SVO co-occurrence")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Run the discovery pipeline over the configured category pairs
    Run {
        /// SVO corpus path (overrides config)
        #[arg(long)]
        svo: Option<PathBuf>,

        /// Categories table path (overrides config)
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Category instance directory (overrides config)
        #[arg(long)]
        instances: Option<PathBuf>,

        /// Output base directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Artifact cache directory (overrides config)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Clustering method: matrix or graph (overrides config)
        #[arg(short, long)]
        method: Option<ClusterMethod>,

        /// Cluster count for the matrix path (overrides config)
        #[arg(short, long)]
        k: Option<usize>,

        /// Promoted pairs per relation (overrides config)
        #[arg(short, long)]
        promote: Option<usize>,
    },

    /// Show current configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Init { .. })
        && let Err(warning) = Settings::check_init()
    {
        eprintln!("Warning: {warning}");
        eprintln!("Using default configuration for now.");
    }

    let mut settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    match cli.command {
        Commands::Init { force } => {
            match Settings::init_config_file(force).context("creating configuration file") {
                Ok(path) => {
                    println!("Created configuration file at: {}", path.display());
                    println!("Edit this file to customize your settings.");
                }
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::ConfigError.exit();
                }
            }
        }

        Commands::Run {
            svo,
            categories,
            instances,
            output,
            cache,
            method,
            k,
            promote,
        } => {
            if let Some(svo) = svo {
                settings.svo_path = svo;
            }
            if let Some(categories) = categories {
                settings.categories_table = categories;
            }
            if let Some(instances) = instances {
                settings.category_dir = instances;
            }
            if let Some(output) = output {
                settings.output_dir = output;
            }
            if let Some(cache) = cache {
                settings.cache_dir = Some(cache);
            }
            if let Some(method) = method {
                settings.clustering.method = method;
            }
            if let Some(k) = k {
                settings.clustering.k = k;
            }
            if let Some(promote) = promote {
                settings.clustering.promote = promote;
            }

            ontext::logging::init(&settings.logging);

            match Driver::new(settings).run() {
                Ok(summary) => {
                    println!(
                        "Completed {} pair(s), {} failed. Reports in {}",
                        summary.pairs_completed,
                        summary.failures.len(),
                        summary.run_dir.display()
                    );
                    for failure in &summary.failures {
                        println!(
                            "  failed [{}] {}: {}",
                            failure.taxonomy, failure.pair, failure.error
                        );
                    }
                    // Per-pair failures are logged, not fatal.
                    ExitCode::Success.exit();
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::ConfigError.exit();
                }
            }
        }

        Commands::Config => {
            match toml::to_string_pretty(&settings).context("serializing configuration") {
                Ok(body) => {
                    println!("# Loaded from {CONFIG_FILE} + ONTEXT_* environment\n{body}")
                }
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::ConfigError.exit();
                }
            }
        }
    }
}
