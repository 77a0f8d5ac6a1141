//! # Optimized Image Library
//!
//! Ottimizzazione trasparente delle immagini caricate, in locale (re-encode
//! con la libreria `image`) oppure tramite l'API TinyPNG, più un batch per
//! ottimizzare retroattivamente le immagini già salvate nei modelli.
//!
//! ## Architettura dei moduli:
//! - `config`: Strategia, chiave API, modalità test e batch
//! - `error`: Tipi di errore custom
//! - `buffer`: Handle degli upload riscritti sul posto
//! - `image_processor`: Strategia locale (decode + re-encode)
//! - `tinify`: Strategia remota (client TinyPNG)
//! - `optimizer`: `BufferOptimizer` e `LegacyOptimizer`
//! - `models`: Astrazione dei modelli e delle righe salvate
//! - `file_manager`: Discovery delle immagini su disco
//! - `progress`: Progress bar e statistiche
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use optimized_image::{BufferOptimizer, Config, UploadedFile};
//!
//! let optimizer = BufferOptimizer::new(Config::from_env()?)?;
//! let mut upload = UploadedFile::new("photo.jpg", bytes);
//! optimizer.optimize(&mut upload).await?;
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod models;
pub mod optimizer;
pub mod progress;
pub mod tinify;

pub use buffer::{DiskFile, FileBuffer, UploadedFile};
pub use config::{BatchMode, Config, OptimizeMethod};
pub use error::OptimizeError;
pub use models::{FieldDescriptor, FieldType, FieldValue, MemoryModel, Model, Row, StoredImage};
pub use optimizer::{BufferOptimizer, LegacyOptimizer};
pub use tinify::{CompressionService, TinifyClient};
