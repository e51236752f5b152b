//! Writes new queue items after letting the user edit the comment text.

use crate::workitem::WorkItem;

use std::env;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use subprocess::Exec;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot prepare file for editing")]
    Temp(#[source] io::Error),
    #[error("Failed to run editor `{0}'")]
    Spawn(String, #[source] subprocess::PopenError),
    #[error("Editor `{0}' exited unsuccessfully, discarding comment")]
    Editor(String),
    #[error("Empty comment for {0}, nothing written")]
    Empty(String),
    #[error("Cannot unassign {0}; use `-1' to revert to the default assignee")]
    Unassign(String),
    #[error("Cannot read {}", .0.display())]
    Read(PathBuf, #[source] io::Error),
    #[error("Cannot write {}", .0.display())]
    Write(PathBuf, #[source] io::Error),
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Editor command from `$VISUAL` or `$EDITOR`
pub fn editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vi".to_owned())
}

/// Runs `editor` on a temporary file pre-filled with `initial` and returns the result verbatim.
///
/// The editor command is split on whitespace so that `code -w` and the like work.
pub fn edit(editor: &str, initial: &str) -> Result<String> {
    let mut tmp = tempfile::Builder::new()
        .prefix("jiraq-")
        .suffix(".txt")
        .tempfile()
        .map_err(Error::Temp)?;
    tmp.write_all(initial.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(Error::Temp)?;
    run_editor(editor, &tmp)?;
    fs::read_to_string(tmp.path()).map_err(Error::Temp)
}

fn run_editor(editor: &str, tmp: &NamedTempFile) -> Result<()> {
    let mut words = editor.split_whitespace();
    let prog = words.next().unwrap_or("vi");
    let status = Exec::cmd(prog)
        .args(&words.collect::<Vec<_>>())
        .arg(tmp.path())
        .join()
        .map_err(|e| Error::Spawn(editor.to_owned(), e))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Editor(editor.to_owned()))
    }
}

#[derive(Debug, Clone)]
pub struct Composer {
    scan_dir: PathBuf,
}

impl Composer {
    pub fn new<P: AsRef<Path>>(scan_dir: P) -> Self {
        Self {
            scan_dir: scan_dir.as_ref().to_owned(),
        }
    }

    pub fn path(&self, item: &WorkItem) -> PathBuf {
        self.scan_dir.join(item.file_name())
    }

    // dispatch would refuse such an item forever
    fn check(item: &WorkItem) -> Result<()> {
        if item.assignee.is_unassign() {
            return Err(Error::Unassign(item.issue_key.clone()));
        }
        Ok(())
    }

    /// Contents of a not yet dispatched item with the same name, if any
    pub fn seed(&self, item: &WorkItem) -> Result<String> {
        Self::check(item)?;
        let p = self.path(item);
        match fs::read_to_string(&p) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::Read(p, e)),
        }
    }

    /// Stores `body` as pending item. Blank bodies are refused.
    pub fn write(&self, item: &WorkItem, body: &str) -> Result<PathBuf> {
        Self::check(item)?;
        if body.trim().is_empty() {
            return Err(Error::Empty(item.issue_key.clone()));
        }
        let p = self.path(item);
        fs::create_dir_all(&self.scan_dir)
            .and_then(|_| fs::write(&p, body))
            .map_err(|e| Error::Write(p.clone(), e))?;
        Ok(p)
    }
}
