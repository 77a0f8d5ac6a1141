//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori possibili
//! - Integra con `thiserror` per automatic error conversion
//! - Gli errori delle librerie wrappate (decoder, HTTP client) vengono
//!   propagati al chiamante senza retry né recovery
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O sul buffer dell'upload
//! - `Image`: Immagine corrotta o non decodificabile
//! - `UnsupportedFormat`: Estensione senza encoder corrispondente
//! - `Http`: Servizio remoto non raggiungibile
//! - `Service`: Risposta di errore dal servizio (credenziali, quota, input)
//! - `MissingApiKey`: Strategia remota senza chiave configurata
//! - `Store`: Errori del record store durante il batch legacy
//!
//! ## Esempio:
//! ```rust,ignore
//! if key.trim().is_empty() {
//!     return Err(OptimizeError::MissingApiKey);
//! }
//! ```

/// Custom error types for image optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Compression service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Compression service error ({status}) {kind}: {message}")]
    Service {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("TinyPNG API key is not configured")]
    MissingApiKey,

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OptimizeError {
    /// True when the service rejected the credentials or the monthly quota is used up
    pub fn is_credential_error(&self) -> bool {
        matches!(self, OptimizeError::Service { status: 401 | 429, .. })
            || matches!(self, OptimizeError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors() {
        let unauthorized = OptimizeError::Service {
            status: 401,
            kind: "Unauthorized".to_string(),
            message: "Credentials are invalid".to_string(),
        };
        assert!(unauthorized.is_credential_error());
        assert!(OptimizeError::MissingApiKey.is_credential_error());

        let bad_input = OptimizeError::Service {
            status: 415,
            kind: "Unsupported media type".to_string(),
            message: "File type is not supported".to_string(),
        };
        assert!(!bad_input.is_credential_error());
        assert_eq!(
            bad_input.to_string(),
            "Compression service error (415) Unsupported media type: File type is not supported"
        );
    }
}
