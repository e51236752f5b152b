//! Remembers the last used queue directories.
//!
//! Each field lives in its own single-line file below the store root. A directory given on the
//! command line is written back so that later invocations can omit it.

use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ScanDir,
    ProcessedDir,
}

impl Field {
    fn file_name(self) -> &'static str {
        match self {
            Field::ScanDir => "scan_dir",
            Field::ProcessedDir => "processed_dir",
        }
    }

    fn option(self) -> &'static str {
        match self {
            Field::ScanDir => "--scan-dir",
            Field::ProcessedDir => "--processed-dir",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::ScanDir => write!(f, "scan directory"),
            Field::ProcessedDir => write!(f, "processed directory"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No {field} given and none remembered from a previous run (use {})", .field.option())]
    Unset { field: Field },
    #[error("Cannot determine user configuration directory")]
    NoConfigDir,
    #[error("Cannot read {}", .0.display())]
    Read(PathBuf, #[source] io::Error),
    #[error("Cannot save {}", .0.display())]
    Write(PathBuf, #[source] io::Error),
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    root: PathBuf,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    /// Store located in the per-user configuration directory
    pub fn user() -> Result<Self> {
        let base = dirs::config_dir().ok_or(Error::NoConfigDir)?;
        Ok(Self::new(base.join(crate_name())))
    }

    fn path(&self, field: Field) -> PathBuf {
        self.root.join(field.file_name())
    }

    pub fn load(&self, field: Field) -> Result<Option<PathBuf>> {
        let p = self.path(field);
        match fs::read_to_string(&p) {
            Ok(s) => {
                let line = s.lines().next().unwrap_or_default().trim_end();
                Ok(if line.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(line))
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Read(p, e)),
        }
    }

    pub fn store(&self, field: Field, dir: &Path) -> Result<()> {
        let p = self.path(field);
        fs::create_dir_all(&self.root)
            .and_then(|_| fs::write(&p, format!("{}\n", dir.display())))
            .map_err(|e| Error::Write(p, e))?;
        debug!("Remembering {} {}", field, dir.display());
        Ok(())
    }

    fn lookup(&self, field: Field, given: &Option<PathBuf>) -> Result<PathBuf> {
        match given {
            Some(dir) => Ok(dir.clone()),
            None => self.load(field)?.ok_or(Error::Unset { field }),
        }
    }

    /// Persists `given` if present, else falls back to the last persisted value.
    pub fn resolve(&self, field: Field, given: Option<PathBuf>) -> Result<PathBuf> {
        let dir = self.lookup(field, &given)?;
        if given.is_some() {
            self.store(field, &dir)?;
        }
        Ok(dir)
    }

    /// Resolves scan and processed directory together. Nothing is persisted unless both are
    /// known.
    pub fn resolve_queue(
        &self,
        scan_dir: Option<PathBuf>,
        processed_dir: Option<PathBuf>,
    ) -> Result<(PathBuf, PathBuf)> {
        let scan = self.lookup(Field::ScanDir, &scan_dir)?;
        let processed = self.lookup(Field::ProcessedDir, &processed_dir)?;
        if scan_dir.is_some() {
            self.store(Field::ScanDir, &scan)?;
        }
        if processed_dir.is_some() {
            self.store(Field::ProcessedDir, &processed)?;
        }
        Ok((scan, processed))
    }
}

fn crate_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
