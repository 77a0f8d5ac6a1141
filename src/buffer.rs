//! # Upload Buffer Module
//!
//! Handle sui file caricati che l'ottimizzatore riscrive sul posto.
//!
//! ## Responsabilità:
//! - `FileBuffer`: trait con seek/read/write/truncate più il nome del file
//! - `UploadedFile`: buffer in memoria posseduto dalla pipeline di upload
//! - `DiskFile`: lo stesso contratto sopra un file su disco (usato dalla CLI)
//! - `overwrite()`: riscrittura completa, nessun byte residuo sopravvive

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A named, seekable byte stream that can be cut at the current position.
pub trait FileBuffer: Read + Write + Seek {
    /// File name, used to infer the image format
    fn name(&self) -> &str;

    /// Drop every byte after the current position
    fn truncate(&mut self) -> io::Result<()>;

    /// Read the whole stream from the start
    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Replace the entire content of `buffer` with `bytes`.
pub fn overwrite<B: FileBuffer + ?Sized>(buffer: &mut B, bytes: &[u8]) -> io::Result<()> {
    buffer.seek(SeekFrom::Start(0))?;
    buffer.write_all(bytes)?;
    buffer.truncate()?;
    buffer.flush()
}

/// In-memory upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    file: Cursor<Vec<u8>>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            file: Cursor::new(content),
        }
    }

    pub fn len(&self) -> usize {
        self.file.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.file.get_ref()
    }

    pub fn position(&self) -> u64 {
        self.file.position()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.file.into_inner()
    }
}

impl Read for UploadedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for UploadedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for UploadedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl FileBuffer for UploadedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn truncate(&mut self) -> io::Result<()> {
        let position = usize::try_from(self.file.position())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.file.get_mut().truncate(position);
        Ok(())
    }
}

/// File on disk opened for in-place rewriting
#[derive(Debug)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    file: File,
}

impl DiskFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl Read for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for DiskFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for DiskFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl FileBuffer for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn truncate(&mut self) -> io::Result<()> {
        let position = self.file.stream_position()?;
        self.file.set_len(position)
    }
}
