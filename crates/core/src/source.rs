use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait FileSource {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn last_modified(&self) -> Option<DateTime<Local>>;
    fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
    modified: Option<DateTime<Local>>,
}

impl LocalFile {
    pub fn open(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)
            .with_context(|| format!("could not stat file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .with_context(|| format!("path has no file name: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::from),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> Option<DateTime<Local>> {
        self.modified
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub modified: Option<DateTime<Local>>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: DateTime<Local>) -> Self {
        self.modified = Some(modified);
        self
    }
}

impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn last_modified(&self) -> Option<DateTime<Local>> {
        self.modified
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}
