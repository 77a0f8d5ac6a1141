//! # File Management Module
//!
//! Discovery delle immagini su disco per la CLI e utilità di formattazione.
//!
//! ## Formati supportati:
//! - JPG, JPEG, PNG, GIF, WebP, BMP, TIF, TIFF
//!
//! ## Operazioni:
//! - `find_images()`: Un file singolo o tutte le immagini sotto una directory
//! - `is_image()`: Determina se il path ha un'estensione supportata
//! - `format_size()`: Converte bytes in formato leggibile (KB, MB, GB)
//! - `calculate_reduction()`: Calcola percentuale di riduzione

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Manages file discovery
pub struct FileManager;

impl FileManager {
    /// `path` itself if it is a supported image, otherwise every supported image below it
    pub fn find_images(path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_file() {
            if Self::is_image(path) {
                return Ok(vec![path.to_path_buf()]);
            }
            warn!("Skipping {}: not a supported image", path.display());
            return Ok(Vec::new());
        }
        if !path.exists() {
            return Err(anyhow::anyhow!("Path does not exist: {}", path.display()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| Self::is_image(p))
            .collect();
        files.sort();

        Ok(files)
    }

    /// Check if a file is an image
    pub fn is_image(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(
                ext_lower.as_str(),
                "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" | "tif" | "tiff"
            )
        } else {
            false
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
