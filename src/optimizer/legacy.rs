//! # Legacy Batch Optimizer
//!
//! Scorre i modelli indicati, trova i campi `OptimizedImage` e controlla
//! ogni riga salvata.
//!
//! In modalità `Report` (default) le immagini trovate vengono solo
//! segnalate: nessuna chiamata all'ottimizzatore, nessun salvataggio.
//! In modalità `Apply` ogni immagine viene ottimizzata e riscritta nello
//! storage del modello. Nessun batching né rate limiting: con TinyPNG ogni
//! immagine consuma una compressione della quota mensile.

use crate::{
    buffer::UploadedFile,
    config::BatchMode,
    models::{FieldType, Model},
    optimizer::BufferOptimizer,
    progress::OptimizationStats,
};
use anyhow::Result;
use std::io::Write;
use tracing::{debug, info};

/// Runs the optimizer over images already stored in model fields
pub struct LegacyOptimizer {
    optimizer: BufferOptimizer,
    mode: BatchMode,
}

impl LegacyOptimizer {
    /// Batch runner using the mode from the optimizer's config
    pub fn new(optimizer: BufferOptimizer) -> Self {
        let mode = optimizer.config().batch_mode;
        Self { optimizer, mode }
    }

    pub fn with_mode(optimizer: BufferOptimizer, mode: BatchMode) -> Self {
        Self { optimizer, mode }
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Attribute names of the fields declared exactly as `OptimizedImage`.
    ///
    /// Custom field types derived from it are not included.
    pub fn optimized_fields(model: &dyn Model) -> Vec<String> {
        model
            .fields()
            .into_iter()
            .filter(|field| field.field_type == FieldType::OptimizedImage)
            .map(|field| field.attname)
            .collect()
    }

    /// Check every row of every model, narrating to stdout when `verbosity == 1`
    pub async fn optimize_models(&self, models: &[&dyn Model], verbosity: u8) -> Result<OptimizationStats> {
        let mut out = std::io::stdout();
        self.optimize_models_to(models, verbosity, &mut out).await
    }

    /// Same as [`optimize_models`](Self::optimize_models), narrating to `out`
    pub async fn optimize_models_to<W: Write + Send>(
        &self,
        models: &[&dyn Model],
        verbosity: u8,
        out: &mut W,
    ) -> Result<OptimizationStats> {
        let narrate = verbosity == 1;
        let mut stats = OptimizationStats::new();

        for model in models {
            if narrate {
                writeln!(out, "Optimizing for model: {}", model.name())?;
            }

            let field_names = Self::optimized_fields(*model);
            debug!("{}: optimized image fields {:?}", model.name(), field_names);
            if narrate {
                writeln!(out, "Will check the following fields: {:?}", field_names)?;
            }

            for row in model.rows()? {
                for field_name in &field_names {
                    if narrate {
                        writeln!(out, "Checking for instance id {} field {}", row.pk, field_name)?;
                    }
                    stats.add_checked();

                    let Some(image) = row.image(field_name).filter(|image| image.is_set()) else {
                        continue;
                    };
                    stats.add_found();

                    if narrate {
                        writeln!(out, "Image found. Optimizing.")?;
                    }

                    if self.mode == BatchMode::Apply {
                        let content = model.read_image(image)?;
                        let original_size = content.len() as u64;

                        let mut upload = UploadedFile::new(image.name.clone(), content);
                        self.optimizer.optimize(&mut upload).await?;
                        let optimized = upload.into_inner();

                        stats.add_optimized(original_size, optimized.len() as u64);
                        model.save_image(row.pk, field_name, optimized)?;
                        debug!("{} {}: rewrote {}", model.name(), row.pk, image.name);
                    }

                    if narrate {
                        writeln!(out, "Optimized and saved image.")?;
                    }
                }
            }
        }

        if !models.is_empty() {
            info!("Legacy batch ({:?}) finished: {}", self.mode, stats.format_summary());
        }
        out.flush()?;

        Ok(stats)
    }
}
