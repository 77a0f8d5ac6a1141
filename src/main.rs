//! # Image Optimizer - Main Entry Point
//!
//! Punto di ingresso della CLI.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Risoluzione della configurazione (file JSON → env → flag CLI)
//! - Avvio dell'ottimizzazione di file su disco o del batch legacy
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-optimizer optimize /srv/media/uploads --method pillow
//! image-optimizer --tinypng-key $KEY --method tinypng legacy catalog.json --verbosity 1 --apply
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use optimized_image::{
    file_manager::FileManager,
    models::{Catalog, Model},
    progress::{OptimizationStats, ProgressManager},
    config::ConfigOverrides,
    BatchMode, BufferOptimizer, Config, DiskFile, LegacyOptimizer, OptimizeMethod,
};

#[derive(Parser)]
#[command(name = "image-optimizer")]
#[command(about = "Optimize uploaded images locally or through TinyPNG")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Optimization method: pillow or tinypng
    #[arg(short, long, global = true)]
    method: Option<OptimizeMethod>,

    /// TinyPNG API key
    #[arg(long, global = true)]
    tinypng_key: Option<String>,

    /// JPEG quality for the local method (1-100)
    #[arg(short, long, global = true)]
    quality: Option<u8>,

    /// Dry run - check everything but leave files untouched
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize image files (or every image under a directory) in place
    Optimize {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Check the images stored in the models of a JSON catalog
    Legacy {
        catalog: PathBuf,

        /// 1 narrates every step, 0 is silent
        #[arg(long, default_value = "0")]
        verbosity: u8,

        /// Optimize and save the images found instead of only reporting them
        #[arg(long)]
        apply: bool,
    },
}

async fn load_config(args: &Args) -> Result<Config> {
    let path = args.config.clone().or_else(Config::default_path);
    let config = match path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    }
    .with_env()?
    .with_overrides(&ConfigOverrides {
        method: args.method,
        tinypng_key: args.tinypng_key.clone(),
        jpeg_quality: args.quality,
        dry_run: args.dry_run,
    });

    config.validate()?;
    Ok(config)
}

async fn optimize_paths(optimizer: &BufferOptimizer, paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::new();
    for path in paths {
        files.extend(FileManager::find_images(path)?);
    }

    if files.is_empty() {
        warn!("No images found");
        return Ok(());
    }

    info!("Optimizing {} image(s) with {}", files.len(), optimizer.config().method);
    let progress = if files.len() > 1 {
        ProgressManager::new(files.len() as u64)
    } else {
        ProgressManager::hidden()
    };
    let mut stats = OptimizationStats::new();

    for path in &files {
        let mut file = DiskFile::open(path)?;
        let original_size = file.len()?;
        stats.add_checked();
        stats.add_found();

        optimizer.optimize(&mut file).await?;
        let new_size = file.len()?;
        stats.add_optimized(original_size, new_size);

        progress.update(&format!(
            "{}: {:.1}% saved",
            path.file_name().unwrap_or_default().to_string_lossy(),
            FileManager::calculate_reduction(original_size, new_size)
        ));
    }

    progress.finish(&stats.format_summary());
    info!("{}", stats.format_summary());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args).await?;
    if config.testing {
        info!("Dry run mode: No files will be modified");
    }

    match args.command {
        Command::Optimize { ref paths } => {
            let optimizer = BufferOptimizer::new(config)?;
            optimize_paths(&optimizer, paths).await?;
        }
        Command::Legacy {
            ref catalog,
            verbosity,
            apply,
        } => {
            if !catalog.exists() {
                return Err(anyhow::anyhow!("Catalog does not exist: {}", catalog.display()));
            }
            let mode = if apply { BatchMode::Apply } else { config.batch_mode };
            if mode == BatchMode::Apply && config.method == OptimizeMethod::TinyPng {
                warn!("Every image found will use one TinyPNG compression from the monthly quota");
            }

            let models = Catalog::from_file(catalog).await?.into_models();
            let model_refs: Vec<&dyn Model> = models.iter().map(|m| m as &dyn Model).collect();

            let optimizer = BufferOptimizer::new(config)?;
            let stats = LegacyOptimizer::with_mode(optimizer, mode)
                .optimize_models(&model_refs, verbosity)
                .await?;
            info!("{}", stats.format_summary());
        }
    }

    Ok(())
}
