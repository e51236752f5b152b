#[macro_use]
extern crate log;

mod compose;
mod credentials;
mod issue;
mod queue;
mod settings;
mod tracker;
mod transition;
mod update;
mod workitem;

use crate::compose::Composer;
use crate::credentials::Credentials;
use crate::queue::{DispatchOpts, Queue};
use crate::settings::{Field, SettingsStore};
use crate::tracker::{Jira, Tracker};
use crate::update::{Update, DEFAULT_ASSIGNEE};
use crate::workitem::WorkItem;

use anyhow::{bail, Context, Error};
use colored::*;
use env_logger::Env;
use std::fs;
use std::io::{stdin, stdout, Read};
use std::path::PathBuf;
use std::time::SystemTime;
use structopt::StructOpt;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    rename_all = "kebab",
    after_help = "\
    Credentials are read from ~/.netrc (or $NETRC) by host name.
    Set RUST_LOG=jiraq=debug in the environment to get full logging output.
    "
)]
pub struct Opt {
    /// Jira server, either host name or base URL
    ///
    /// Alternatively set the JIRAQ_HOST environment variable
    #[structopt(short = "H", long, global = true, env = "JIRAQ_HOST")]
    host: Option<String>,
    #[structopt(subcommand)]
    command: Cmd,
}

#[derive(Debug, Clone, StructOpt)]
pub enum Cmd {
    /// Shows issue details.
    Issue(IssueOpt),
    /// Adds a comment to and/or reassigns a single issue.
    Update(UpdateOpt),
    /// Moves an issue through its workflow.
    Transition(TransitionOpt),
    /// Edits a comment and queues it in the scan directory.
    Compose(ComposeOpt),
    /// Posts all queued comments and archives them.
    Dispatch(DispatchOpt),
}

#[derive(Debug, Clone, StructOpt, Default)]
pub struct IssueOpt {
    /// Additional fields to show, by name or id
    #[structopt(short, long = "field", value_name = "NAME", number_of_values = 1)]
    fields: Vec<String>,
    /// Dump raw JSON instead
    #[structopt(long)]
    json: bool,
    #[structopt(value_name = "ISSUE")]
    issue: String,
}

#[derive(Debug, Clone, StructOpt, Default)]
pub struct UpdateOpt {
    /// Issue key
    #[structopt(short, long, value_name = "ISSUE")]
    issue: String,
    /// Comment text
    #[structopt(short, long, value_name = "TEXT", conflicts_with = "file")]
    comment: Option<String>,
    /// Read comment from file ("-" for stdin)
    #[structopt(short, long, value_name = "PATH", parse(from_os_str))]
    file: Option<PathBuf>,
    /// New assignee ("-1" reverts to the default assignee)
    #[structopt(
        short,
        long,
        value_name = "USER",
        allow_hyphen_values = true,
        conflicts_with = "default-assignee"
    )]
    assignee: Option<String>,
    /// Revert to the project's default assignee (same as -a -1)
    #[structopt(short = "D", long)]
    default_assignee: bool,
}

#[derive(Debug, Clone, StructOpt, Default)]
pub struct TransitionOpt {
    /// Issue key
    #[structopt(short, long, value_name = "ISSUE")]
    issue: String,
    /// List available transitions (in server order, which decides ties)
    #[structopt(short, long)]
    list: bool,
    /// Transition name or any part of it; the first match wins
    #[structopt(value_name = "NAME", required_unless = "list")]
    name: Option<String>,
}

#[derive(Debug, Clone, StructOpt, Default)]
pub struct ComposeOpt {
    /// Queue directory (remembered for later runs)
    #[structopt(short, long, value_name = "DIR", parse(from_os_str))]
    scan_dir: Option<PathBuf>,
    /// Assign the issue to USER when dispatching ("-1" reverts to the default assignee)
    #[structopt(short, long, value_name = "USER", allow_hyphen_values = true)]
    assignee: Option<String>,
    #[structopt(value_name = "ISSUE")]
    issue: String,
}

#[derive(Debug, Clone, StructOpt, Default)]
pub struct DispatchOpt {
    /// Don't announce individual items
    #[structopt(short, long)]
    quiet: bool,
    /// Report what would be done without contacting Jira or moving files
    #[structopt(short = "n", long)]
    dry_run: bool,
    /// Queue directory (remembered for later runs)
    #[structopt(short, long, value_name = "DIR", parse(from_os_str))]
    scan_dir: Option<PathBuf>,
    /// Archive for dispatched items (remembered for later runs)
    #[structopt(short, long, value_name = "DIR", parse(from_os_str))]
    processed_dir: Option<PathBuf>,
}

fn create_tracker(opt: &Opt) -> Result<Jira> {
    let host = match &opt.host {
        Some(h) => h,
        None => bail!(
            "No Jira host given either as option or via the JIRAQ_HOST environment variable"
        ),
    };
    let cred = Credentials::for_host(&Jira::host_name(host)?)?;
    Ok(Jira::new(host, cred)?)
}

fn issue(opt: &Opt, i_opt: &IssueOpt) -> Result<()> {
    let tracker = create_tracker(opt)?;
    let iss = tracker
        .issue(&i_opt.issue)
        .with_context(|| format!("Failed to fetch {}", i_opt.issue))?;
    if i_opt.json {
        serde_json::to_writer_pretty(stdout().lock(), &iss).context("broken pipe")?;
        println!();
        return Ok(());
    }
    print!("{}", iss);
    if i_opt.fields.is_empty() {
        return Ok(());
    }
    let defs = tracker.fields().context("Failed to fetch field list")?;
    println!();
    for name in &i_opt.fields {
        let id = issue::field_id(&defs, name).unwrap_or(name);
        match iss.field(id) {
            Some(v) => println!("{}: {}", name, issue::render_value(&v)),
            None => warn!("{}: no such field in {}", name, iss.key),
        }
    }
    Ok(())
}

fn read_comment(u_opt: &UpdateOpt) -> Result<Option<String>> {
    Ok(match (&u_opt.comment, &u_opt.file) {
        (Some(c), _) => Some(c.clone()),
        (None, Some(f)) if f.as_os_str() == "-" => {
            let mut s = String::new();
            stdin()
                .read_to_string(&mut s)
                .context("Cannot read comment from stdin")?;
            Some(s)
        }
        (None, Some(f)) => Some(
            fs::read_to_string(f)
                .with_context(|| format!("Cannot read comment from {}", f.display()))?,
        ),
        (None, None) => None,
    })
}

fn update(opt: &Opt, u_opt: &UpdateOpt) -> Result<()> {
    let mut upd = Update::new(&u_opt.issue);
    upd.comment = read_comment(u_opt)?;
    upd.assignee = if u_opt.default_assignee {
        Some(DEFAULT_ASSIGNEE.to_owned())
    } else {
        u_opt.assignee.clone()
    };
    if upd.comment.is_none() && upd.assignee.is_none() {
        bail!("Either a comment (-c/-f) or an assignee (-a/-D) is required");
    }
    let tracker = create_tracker(opt)?;
    let outcome = upd.apply(&tracker)?;
    info!("{}: {}", upd.issue_key.yellow(), outcome.to_string().green());
    Ok(())
}

fn transition(opt: &Opt, t_opt: &TransitionOpt) -> Result<()> {
    let tracker = create_tracker(opt)?;
    if t_opt.list {
        let avail = tracker
            .transitions(&t_opt.issue)
            .with_context(|| format!("Failed to fetch transitions for {}", t_opt.issue))?;
        for t in avail {
            match t.to {
                Some(to) => println!("{}\t{} -> {}", t.id, t.name, to.name),
                None => println!("{}\t{}", t.id, t.name),
            }
        }
        return Ok(());
    }
    let name = t_opt.name.as_deref().unwrap_or_default();
    let t = transition::perform(&tracker, &t_opt.issue, name)?;
    info!("{}: {}", t_opt.issue.yellow(), t.name.green());
    Ok(())
}

fn compose(c_opt: &ComposeOpt) -> Result<()> {
    let store = SettingsStore::user()?;
    let item = WorkItem::new(&c_opt.issue, c_opt.assignee.as_deref())?;
    let scan_dir = store.resolve(Field::ScanDir, c_opt.scan_dir.clone())?;
    let composer = Composer::new(&scan_dir);
    let seed = composer.seed(&item)?;
    let body = compose::edit(&compose::editor(), &seed)?;
    let path = composer.write(&item, &body)?;
    info!("{}: queued {}", item.to_string().yellow(), path.display());
    Ok(())
}

fn dispatch(opt: &Opt, d_opt: &DispatchOpt) -> Result<()> {
    // resolve everything before touching the queue
    if opt.host.is_none() {
        bail!("No Jira host given either as option or via the JIRAQ_HOST environment variable");
    }
    let store = SettingsStore::user()?;
    let (scan_dir, processed_dir) =
        store.resolve_queue(d_opt.scan_dir.clone(), d_opt.processed_dir.clone())?;
    let tracker = create_tracker(opt)?;
    let q = Queue::new(scan_dir, processed_dir);
    let opts = DispatchOpts {
        dry_run: d_opt.dry_run,
        quiet: d_opt.quiet,
    };
    let summary = q.run(&tracker, &opts, SystemTime::now())?;
    if !opts.dry_run {
        info!(
            "Dispatched {} item(s), purged {} processed item(s)",
            summary.dispatched.len(),
            summary.purged.len()
        );
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenv::dotenv().ok();
    let opt = Opt::from_args();
    match opt.command {
        Cmd::Issue(ref i) => issue(&opt, i),
        Cmd::Update(ref u) => update(&opt, u),
        Cmd::Transition(ref t) => transition(&opt, t),
        Cmd::Compose(ref c) => compose(c),
        Cmd::Dispatch(ref d) => dispatch(&opt, d),
    }
}

fn main() {
    env_logger::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        for e in err.chain() {
            error!("{}", e);
            // reqwest seems to fold all causes into its head error
            if e.downcast_ref::<reqwest::Error>().is_some() {
                break;
            }
        }
        std::process::exit(1);
    }
}
