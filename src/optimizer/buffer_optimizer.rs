//! # Buffer Optimizer
//!
//! Riscrive sul posto il contenuto di un upload con la strategia configurata.

use crate::{
    buffer::{overwrite, FileBuffer},
    config::{Config, OptimizeMethod},
    error::OptimizeError,
    image_processor,
    tinify::{CompressionService, TinifyClient},
};
use std::sync::Arc;
use tracing::debug;

/// Optimizes upload buffers in place
#[derive(Clone)]
pub struct BufferOptimizer {
    config: Config,
    service: Option<Arc<dyn CompressionService>>,
}

impl BufferOptimizer {
    /// Build the optimizer, creating the TinyPNG client when the remote method is selected
    pub fn new(config: Config) -> Result<Self, OptimizeError> {
        let service: Option<Arc<dyn CompressionService>> =
            if config.method == OptimizeMethod::TinyPng && !config.testing {
                let key = config.api_key().ok_or(OptimizeError::MissingApiKey)?;
                Some(Arc::new(TinifyClient::new(&config.tinypng_endpoint, key)?))
            } else {
                None
            };

        Ok(Self { config, service })
    }

    /// Use `service` for the remote method instead of the HTTP client
    pub fn with_service(config: Config, service: Arc<dyn CompressionService>) -> Self {
        Self {
            config,
            service: Some(service),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rewrite `buffer` with its optimized bytes and hand it back.
    ///
    /// A no-op in testing mode. Decoder, encoder and service errors are
    /// returned as-is; the buffer may be left partially read but is never
    /// partially written.
    pub async fn optimize<'a, B>(&self, buffer: &'a mut B) -> Result<&'a mut B, OptimizeError>
    where
        B: FileBuffer + Send + ?Sized,
    {
        if self.config.testing {
            return Ok(buffer);
        }

        let original = buffer.read_all()?;
        let optimized = match self.config.method {
            OptimizeMethod::Local => {
                let format = image_processor::output_format(buffer.name())?;
                image_processor::reencode(&original, format, self.config.jpeg_quality)?
            }
            OptimizeMethod::TinyPng => {
                let service = self.service.as_ref().ok_or(OptimizeError::MissingApiKey)?;
                service.compress(original.clone()).await?
            }
        };

        overwrite(buffer, &optimized)?;
        debug!(
            "Optimized {} with {}: {} -> {} bytes",
            buffer.name(),
            self.config.method,
            original.len(),
            optimized.len()
        );

        Ok(buffer)
    }
}
