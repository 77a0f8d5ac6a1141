//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di ottimizzazione.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Progress bar `indicatif` per le esecuzioni multi-file della CLI
//! - `OptimizationStats`: Contatori cumulativi (campi controllati, immagini
//!   trovate, ottimizzate, byte risparmiati)
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new(total_files);
//! let mut stats = OptimizationStats::new();
//!
//! stats.add_optimized(original_size, new_size);
//! progress.update("photo.jpg");
//!
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for multi-file runs
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Statistics tracker for optimization results
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptimizationStats {
    /// Field values inspected (row × field)
    pub fields_checked: usize,
    /// Values holding a non-empty image name
    pub images_found: usize,
    pub files_optimized: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_checked(&mut self) {
        self.fields_checked += 1;
    }

    pub fn add_found(&mut self) {
        self.images_found += 1;
    }

    pub fn add_optimized(&mut self, original_size: u64, new_size: u64) {
        self.files_optimized += 1;
        self.total_original_size += original_size;
        self.total_bytes_saved += original_size.saturating_sub(new_size);
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Checked: {} | Images found: {} | Optimized: {} | Total saved: {} ({:.2}%)",
            self.fields_checked,
            self.images_found,
            self.files_optimized,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = OptimizationStats::new();
        stats.add_checked();
        stats.add_checked();
        stats.add_found();
        stats.add_optimized(2048, 1024);

        assert_eq!(stats.fields_checked, 2);
        assert_eq!(stats.images_found, 1);
        assert_eq!(stats.files_optimized, 1);
        assert_eq!(stats.total_bytes_saved, 1024);
        assert_eq!(stats.overall_reduction_percent(), 50.0);
        assert_eq!(
            stats.format_summary(),
            "Checked: 2 | Images found: 1 | Optimized: 1 | Total saved: 1.00 KB (50.00%)"
        );
    }

    #[test]
    fn test_growth_saves_nothing() {
        let mut stats = OptimizationStats::new();
        stats.add_optimized(100, 150);
        assert_eq!(stats.total_bytes_saved, 0);
        assert_eq!(stats.overall_reduction_percent(), 0.0);
    }

    #[test]
    fn test_hidden_progress() {
        let progress = ProgressManager::hidden();
        progress.update("a.png");
        progress.update("b.png");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }
}
