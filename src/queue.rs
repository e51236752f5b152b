//! Directory based comment queue.
//!
//! Pending items are text files directly inside the scan directory. Each run dispatches them in
//! descending file name order, moves successfully dispatched files into the processed directory
//! and finally purges processed files which are older than [`RETENTION`].
//!
//! Descending order applies `ABC-1.txt` before `ABC-1.someone.txt`. This lets an operator drop a
//! plain note first and a reassignment second for the same issue.

use crate::tracker::Tracker;
use crate::update::{self, Update};
use crate::workitem::{ParseError, WorkItem};

use colored::*;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Processed items are kept this long (by modification time)
pub const RETENTION: Duration = Duration::from_secs(5 * 24 * 3600);

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot list scan directory {}", .0.display())]
    ScanDir(PathBuf, #[source] io::Error),
    #[error("Malformed queue item")]
    Parse(#[from] ParseError),
    #[error("Cannot read {}", .0.display())]
    Read(PathBuf, #[source] io::Error),
    #[error("Failed to dispatch {}", .file.display())]
    Update {
        file: PathBuf,
        #[source]
        source: update::Error,
    },
    #[error("Cannot move {} to {}", .file.display(), .dest.display())]
    Archive {
        file: PathBuf,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot purge processed item {}", .0.display())]
    Sweep(PathBuf, #[source] io::Error),
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Default)]
pub struct DispatchOpts {
    /// Report only. Neither calls the tracker nor touches any file.
    pub dry_run: bool,
    /// Suppress per-item announcements
    pub quiet: bool,
}

/// Pending item in the scan directory
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    pub path: PathBuf,
    pub name: String,
    pub item: WorkItem,
}

impl Pending {
    fn update(&self, body: String) -> Update {
        let mut upd = Update::new(&self.item.issue_key);
        if !body.trim().is_empty() {
            upd = upd.comment(body);
        }
        if let Some(a) = self.item.assignee.as_deref() {
            upd = upd.assignee(a);
        }
        upd
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// File names in the order they were dispatched
    pub dispatched: Vec<String>,
    pub purged: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Queue {
    pub scan_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Queue {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(scan_dir: P, processed_dir: Q) -> Self {
        Self {
            scan_dir: scan_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// Lists and decodes all pending items, highest file name first.
    ///
    /// Fails on the first malformed name so that nothing gets dispatched from a queue containing
    /// garbage.
    pub fn pending(&self) -> Result<Vec<Pending>> {
        let err = |e| Error::ScanDir(self.scan_dir.clone(), e);
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.scan_dir).map_err(err)? {
            let e = entry.map_err(err)?;
            let path = e.path();
            if !e.file_type().map_err(err)?.is_file()
                || path.extension().map_or(true, |ext| ext != "txt")
            {
                continue;
            }
            let name = e.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                debug!("Ignoring hidden file {}", name);
                continue;
            }
            let item = WorkItem::from_file_name(&name)?;
            items.push(Pending { path, name, item });
        }
        items.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(items)
    }

    /// Applies all pending items in order. Stops at the first failure.
    pub fn dispatch(&self, tracker: &dyn Tracker, opts: &DispatchOpts) -> Result<Summary> {
        let items = self.pending()?;
        if items.is_empty() {
            info!("No pending items in {}", self.scan_dir.display());
        }
        let mut summary = Summary::default();
        for p in items {
            let body = fs::read_to_string(&p.path).map_err(|e| Error::Read(p.path.clone(), e))?;
            let upd = p.update(body);
            if opts.dry_run {
                upd.validate().map_err(|source| Error::Update {
                    file: p.path.clone(),
                    source,
                })?;
                println!("{}: would {}", p.name, describe(&upd));
                continue;
            }
            if !opts.quiet {
                info!("{}: {}", p.name.yellow(), p.item);
            }
            let outcome = upd.apply(tracker).map_err(|source| Error::Update {
                file: p.path.clone(),
                source,
            })?;
            self.archive(&p)?;
            if !opts.quiet {
                info!("{}: {}", p.item.issue_key.yellow(), outcome.to_string().green());
            }
            summary.dispatched.push(p.name);
        }
        Ok(summary)
    }

    fn archive(&self, p: &Pending) -> Result<()> {
        let dest = self.processed_dir.join(&p.name);
        let err = |source| Error::Archive {
            file: p.path.clone(),
            dest: dest.clone(),
            source,
        };
        fs::create_dir_all(&self.processed_dir).map_err(err)?;
        if let Err(e) = fs::rename(&p.path, &dest) {
            // rename does not work across file systems
            debug!("Cannot rename {}: {}, copying instead", p.path.display(), e);
            fs::copy(&p.path, &dest)
                .and_then(|_| fs::remove_file(&p.path))
                .map_err(err)?;
        }
        // retention starts with processing, not with creation
        if let Err(e) = fs::File::options()
            .write(true)
            .open(&dest)
            .and_then(|f| f.set_modified(SystemTime::now()))
        {
            warn!("Cannot update timestamp of {}: {}", dest.display(), e);
        }
        debug!("Moved {} to {}", p.name, self.processed_dir.display());
        Ok(())
    }

    /// Deletes processed items which are older than [`RETENTION`] at `now`.
    ///
    /// Items exactly at the retention boundary are kept. Returns the affected paths.
    pub fn sweep(&self, now: SystemTime, dry_run: bool) -> Result<Vec<PathBuf>> {
        let dir = &self.processed_dir;
        let entries = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Sweep(dir.clone(), e)),
        };
        let mut purged = Vec::new();
        for entry in entries {
            let e = entry.map_err(|e| Error::Sweep(dir.clone(), e))?;
            let path = e.path();
            let meta = e.metadata().map_err(|e| Error::Sweep(path.clone(), e))?;
            if !meta.is_file() {
                continue;
            }
            let mtime = meta.modified().map_err(|e| Error::Sweep(path.clone(), e))?;
            // mtime in the future counts as fresh
            let expired = now
                .duration_since(mtime)
                .map_or(false, |age| age > RETENTION);
            if !expired {
                continue;
            }
            if dry_run {
                println!("{}: would purge", path.display());
            } else {
                fs::remove_file(&path).map_err(|e| Error::Sweep(path.clone(), e))?;
                debug!("Purged {}", path.display());
            }
            purged.push(path);
        }
        purged.sort();
        Ok(purged)
    }

    /// Dispatches, then sweeps. The sweep also runs after a failed dispatch.
    pub fn run(&self, tracker: &dyn Tracker, opts: &DispatchOpts, now: SystemTime) -> Result<Summary> {
        let res = self.dispatch(tracker, opts);
        let swept = self.sweep(now, opts.dry_run);
        match (res, swept) {
            (Ok(mut summary), Ok(purged)) => {
                summary.purged = purged;
                Ok(summary)
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(sweep_err)) => {
                error!("{}", sweep_err);
                Err(e)
            }
        }
    }
}

fn describe(upd: &Update) -> &'static str {
    match (&upd.assignee, &upd.comment) {
        (Some(_), Some(_)) => "assign and comment",
        (Some(_), None) => "assign",
        _ => "comment",
    }
}

// === Tests ===
