//! # Optimizer Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `buffer_optimizer`: Riscrittura sul posto di un singolo upload
//! - `legacy`: Batch sulle immagini già salvate nei modelli

pub mod buffer_optimizer;
pub mod legacy;

pub use buffer_optimizer::BufferOptimizer;
pub use legacy::LegacyOptimizer;
