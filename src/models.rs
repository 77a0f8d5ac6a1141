//! # Record Store Module
//!
//! Astrazione minima dei modelli persistiti su cui lavora il batch legacy.
//!
//! ## Responsabilità:
//! - Descrive i campi di un modello (`FieldDescriptor`, `FieldType`)
//! - Espone le righe salvate (`Row`) e i valori dei campi immagine
//! - Delega lettura/scrittura dei byte allo storage del modello
//!
//! ## Implementazioni:
//! - `MemoryModel`: store in memoria, usato da test ed embedding
//! - `DirectoryModel`: modello descritto da un catalogo JSON, con le
//!   immagini salvate come file sotto una media root
//!
//! ## Esempio catalogo:
//! ```json
//! {
//!   "media_root": "/srv/media",
//!   "models": [
//!     {
//!       "name": "Photo",
//!       "fields": [
//!         { "attname": "id", "type": "integer" },
//!         { "attname": "picture", "type": "optimized_image" }
//!       ],
//!       "rows": [
//!         { "pk": 1, "values": { "picture": "photos/beach.jpg" } },
//!         { "pk": 2, "values": { "picture": "" } }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::error::OptimizeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Declared type of a model field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    OptimizedImage,
    Image,
    File,
    Char,
    Integer,
    /// User-defined field type derived from `parent`
    Custom { name: String, parent: Box<FieldType> },
}

impl FieldType {
    /// Whether values of this type are stored images
    pub fn holds_image(&self) -> bool {
        match self {
            FieldType::OptimizedImage | FieldType::Image => true,
            FieldType::Custom { parent, .. } => parent.holds_image(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub attname: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(attname: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            attname: attname.into(),
            field_type,
        }
    }
}

/// Reference to an image in the model's storage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredImage {
    pub name: String,
}

impl StoredImage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// An image field with no file attached has an empty name
    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Image(StoredImage),
    Text(String),
    Integer(i64),
    Null,
}

impl FieldValue {
    pub fn image(name: impl Into<String>) -> Self {
        FieldValue::Image(StoredImage::new(name))
    }

    /// Convert a catalog JSON value according to the declared type
    pub fn from_json(field_type: &FieldType, value: &serde_json::Value) -> Self {
        use serde_json::Value;

        if field_type.holds_image() {
            return match value {
                Value::String(name) => FieldValue::image(name.as_str()),
                _ => FieldValue::Image(StoredImage::default()),
            };
        }

        match value {
            Value::Null => FieldValue::Null,
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Integer)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

/// One persisted record
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub pk: i64,
    pub values: HashMap<String, FieldValue>,
}

impl Row {
    pub fn new(pk: i64) -> Self {
        Self {
            pk,
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, attname: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(attname.into(), value);
        self
    }

    pub fn get(&self, attname: &str) -> Option<&FieldValue> {
        self.values.get(attname)
    }

    /// Image stored in `attname`, if that field holds one
    pub fn image(&self, attname: &str) -> Option<&StoredImage> {
        match self.values.get(attname) {
            Some(FieldValue::Image(image)) => Some(image),
            _ => None,
        }
    }
}

/// A persisted model: its field metadata, rows and image storage.
pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    fn fields(&self) -> Vec<FieldDescriptor>;

    /// Every stored row, in the store's default order
    fn rows(&self) -> Result<Vec<Row>, OptimizeError>;

    /// Bytes of a stored image
    fn read_image(&self, image: &StoredImage) -> Result<Vec<u8>, OptimizeError>;

    /// Replace the bytes of the image held by `attname` on row `pk`
    fn save_image(&self, pk: i64, attname: &str, content: Vec<u8>) -> Result<(), OptimizeError>;
}

/// In-memory model with a name → bytes storage
#[derive(Debug)]
pub struct MemoryModel {
    name: String,
    fields: Vec<FieldDescriptor>,
    rows: Vec<Row>,
    storage: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryModel {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows: Vec::new(),
            storage: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Put `content` in storage under `name`
    pub fn with_file(self, name: impl Into<String>, content: Vec<u8>) -> Self {
        if let Ok(mut storage) = self.storage.lock() {
            storage.insert(name.into(), content);
        }
        self
    }

    /// Current bytes stored under `name`
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.storage.lock().ok()?.get(name).cloned()
    }

    fn stored_name(&self, pk: i64, attname: &str) -> Result<String, OptimizeError> {
        self.rows
            .iter()
            .find(|row| row.pk == pk)
            .and_then(|row| row.image(attname))
            .filter(|image| image.is_set())
            .map(|image| image.name.clone())
            .ok_or_else(|| {
                OptimizeError::Store(format!("{} {} has no image in {}", self.name, pk, attname))
            })
    }
}

impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields.clone()
    }

    fn rows(&self) -> Result<Vec<Row>, OptimizeError> {
        Ok(self.rows.clone())
    }

    fn read_image(&self, image: &StoredImage) -> Result<Vec<u8>, OptimizeError> {
        self.file(&image.name)
            .ok_or_else(|| OptimizeError::Store(format!("missing file {}", image.name)))
    }

    fn save_image(&self, pk: i64, attname: &str, content: Vec<u8>) -> Result<(), OptimizeError> {
        let name = self.stored_name(pk, attname)?;
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| OptimizeError::Store("storage lock poisoned".to_string()))?;
        storage.insert(name, content);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRow {
    pub pk: i64,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogModel {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub rows: Vec<CatalogRow>,
}

/// JSON description of models backed by files under `media_root`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub media_root: PathBuf,
    pub models: Vec<CatalogModel>,
}

impl Catalog {
    /// Load a catalog; a relative `media_root` is resolved against the catalog's directory
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut catalog: Catalog = serde_json::from_str(&content)?;

        if catalog.media_root.is_relative() {
            if let Some(parent) = path.parent() {
                catalog.media_root = parent.join(&catalog.media_root);
            }
        }
        Ok(catalog)
    }

    pub fn into_models(self) -> Vec<DirectoryModel> {
        let media_root = self.media_root;
        self.models
            .into_iter()
            .map(|model| DirectoryModel::new(model, media_root.clone()))
            .collect()
    }
}

/// Catalog model whose images live under `media_root`
#[derive(Debug, Clone)]
pub struct DirectoryModel {
    model: CatalogModel,
    media_root: PathBuf,
}

impl DirectoryModel {
    pub fn new(model: CatalogModel, media_root: PathBuf) -> Self {
        Self { model, media_root }
    }

    /// Location of `name` under the media root; absolute names and `..` are rejected
    fn path_of(&self, name: &str) -> Result<PathBuf, OptimizeError> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes || relative.is_absolute() {
            return Err(OptimizeError::Store(format!(
                "{} is outside the media root",
                name
            )));
        }
        Ok(self.media_root.join(relative))
    }
}

impl Model for DirectoryModel {
    fn name(&self) -> &str {
        &self.model.name
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.model.fields.clone()
    }

    fn rows(&self) -> Result<Vec<Row>, OptimizeError> {
        let rows = self
            .model
            .rows
            .iter()
            .map(|catalog_row| {
                let mut row = Row::new(catalog_row.pk);
                for field in &self.model.fields {
                    let value = catalog_row
                        .values
                        .get(&field.attname)
                        .map(|v| FieldValue::from_json(&field.field_type, v))
                        .unwrap_or_else(|| FieldValue::from_json(&field.field_type, &serde_json::Value::Null));
                    row.values.insert(field.attname.clone(), value);
                }
                row
            })
            .collect();
        Ok(rows)
    }

    fn read_image(&self, image: &StoredImage) -> Result<Vec<u8>, OptimizeError> {
        Ok(std::fs::read(self.path_of(&image.name)?)?)
    }

    fn save_image(&self, pk: i64, attname: &str, content: Vec<u8>) -> Result<(), OptimizeError> {
        let name = self
            .model
            .rows
            .iter()
            .find(|row| row.pk == pk)
            .and_then(|row| row.values.get(attname))
            .and_then(|value| value.as_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                OptimizeError::Store(format!("{} {} has no image in {}", self.model.name, pk, attname))
            })?;

        let path = self.path_of(name)?;
        debug!("Writing {} bytes to {}", content.len(), path.display());
        std::fs::write(path, content)?;
        Ok(())
    }
}
