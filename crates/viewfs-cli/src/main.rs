use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use viewfs::{DirectoryEntry, FileProvider, Lookup, WatchToken};
use viewfs_config::{init_tracing, load_for_dir, ViewFsConfig};
use viewfs_tree::TreeNode;

#[derive(Parser)]
#[command(
    name = "viewfs",
    version,
    about = "Inspect how virtual view/page paths resolve to disk"
)]
struct Cli {
    #[command(flatten)]
    roots: RootArgs,
    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RootArgs {
    /// Config file (defaults to `viewfs.toml` discovery in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Application name; the module path becomes `Areas/{name}`
    #[arg(long, global = true, conflicts_with = "module_path")]
    name: Option<String>,
    /// Explicit virtual module path
    #[arg(long, global = true)]
    module_path: Option<String>,
    /// Physical directory mapped to the module path
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Physical directory sub-resources resolve against (defaults to --root)
    #[arg(long, global = true)]
    base: Option<PathBuf>,
    /// Poll interval for `watch`, in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// List a virtual directory
    Ls { path: String },
    /// Show where a virtual file resolves and whether it exists
    Stat { path: String },
    /// Print a virtual file's contents
    Cat { path: String },
    /// Wait for a virtual file to change
    Watch {
        path: String,
        /// Give up after this many milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },
    /// Find or remove nodes in a JSON content tree
    Tree(TreeArgs),
}

#[derive(Args)]
struct TreeArgs {
    #[command(subcommand)]
    command: TreeCommand,
}

#[derive(Subcommand)]
enum TreeCommand {
    /// Print the node with the given id
    Find {
        /// JSON file holding the root node array
        #[arg(long)]
        file: PathBuf,
        id: String,
    },
    /// Remove the node with the given id and save the file
    Remove {
        #[arg(long)]
        file: PathBuf,
        id: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryJson {
    name: String,
    path: PathBuf,
    is_dir: bool,
    len: u64,
}

impl From<DirectoryEntry> for EntryJson {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            is_dir: entry.is_dir,
            len: entry.len,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatJson {
    path: String,
    physical_path: PathBuf,
    exists: bool,
    len: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    if let Command::Tree(args) = cli.command {
        return run_tree(args.command, cli.json);
    }

    let config = load_config(&cli.roots)?;
    init_tracing(&config.logging);
    let provider = config
        .overlay_provider()
        .context("failed to configure application roots")?;
    run_lookup(&provider, cli.command, cli.json)
}

fn load_config(args: &RootArgs) -> Result<ViewFsConfig> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let mut config = match &args.config {
        Some(path) => ViewFsConfig::load_from_path(path)?,
        None => load_for_dir(&cwd)?,
    };

    let absolute = |path: &Path| cwd.join(path);
    if args.name.is_some() || args.module_path.is_some() {
        config.application.name = args.name.clone();
        config.application.module_path = args.module_path.clone();
    }
    if let Some(root) = &args.root {
        config.application.path = Some(absolute(root));
    }
    if let Some(base) = &args.base {
        config.application.base = Some(absolute(base));
    }
    if let Some(interval) = args.poll_interval_ms {
        config.watch.poll_interval_ms = interval;
    }
    Ok(config)
}

fn run_lookup(provider: &dyn FileProvider, command: Command, json: bool) -> Result<i32> {
    let mut stdout = std::io::stdout().lock();
    match command {
        Command::Ls { path } => {
            let Lookup::Found(listing) = provider.list_directory(Some(&path)) else {
                return not_found(&path);
            };
            let entries = listing
                .entries()
                .with_context(|| format!("failed to list {path}"))?;
            if json {
                let entries: Vec<EntryJson> = entries.into_iter().map(EntryJson::from).collect();
                serde_json::to_writer_pretty(&mut stdout, &entries)?;
                writeln!(stdout)?;
            } else {
                for entry in entries {
                    let marker = if entry.is_dir { 'd' } else { '-' };
                    writeln!(stdout, "{marker} {:>10} {}", entry.len, entry.name)?;
                }
            }
        }
        Command::Stat { path } => {
            let Lookup::Found(info) = provider.file_info(Some(&path)) else {
                return not_found(&path);
            };
            let metadata = info
                .metadata()
                .with_context(|| format!("failed to stat {path}"))?
                .filter(|metadata| !metadata.is_dir);
            let stat = StatJson {
                path: viewfs::normalize(&path).into_string(),
                physical_path: info.physical_path().to_path_buf(),
                exists: metadata.is_some(),
                len: metadata.map(|metadata| metadata.len),
            };
            if json {
                serde_json::to_writer_pretty(&mut stdout, &stat)?;
                writeln!(stdout)?;
            } else {
                writeln!(stdout, "path:     {}", stat.path)?;
                writeln!(stdout, "physical: {}", stat.physical_path.display())?;
                match stat.len {
                    Some(len) => writeln!(stdout, "exists:   yes ({len} bytes)")?,
                    None => writeln!(stdout, "exists:   no")?,
                }
            }
        }
        Command::Cat { path } => {
            let Lookup::Found(info) = provider.file_info(Some(&path)) else {
                return not_found(&path);
            };
            let bytes = info
                .read()
                .with_context(|| format!("failed to read {}", info.physical_path().display()))?;
            stdout.write_all(&bytes)?;
        }
        Command::Watch { path, timeout_ms } => {
            let token = provider.watch(Some(&path));
            if !token.is_active() {
                eprintln!("not watchable: {path}");
                return Ok(1);
            }
            if let WatchToken::Polling(polling) = &token {
                tracing::info!(
                    target = "viewfs.cli",
                    physical = %polling.path().display(),
                    "watching for changes"
                );
            }
            let changed = token.wait_timeout(Duration::from_millis(timeout_ms));
            writeln!(stdout, "{}", if changed { "changed" } else { "timeout" })?;
            return Ok(if changed { 0 } else { 1 });
        }
        Command::Tree(args) => return run_tree(args.command, json),
    }
    Ok(0)
}

fn not_found(path: &str) -> Result<i32> {
    eprintln!("not found: {path}");
    Ok(1)
}

fn run_tree(command: TreeCommand, json: bool) -> Result<i32> {
    match command {
        TreeCommand::Find { file, id } => {
            let roots = read_tree(&file)?;
            let Some(node) = viewfs_tree::find(&roots, &id) else {
                return not_found(&id);
            };
            let mut stdout = std::io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(&mut stdout, node)?;
                writeln!(stdout)?;
            } else {
                writeln!(
                    stdout,
                    "{} {} ({} children)",
                    node.unique_id,
                    node.name,
                    node.children.len()
                )?;
            }
        }
        TreeCommand::Remove { file, id } => {
            let mut roots = read_tree(&file)?;
            let Some(removed) = viewfs_tree::remove_by_id(&mut roots, &id) else {
                return not_found(&id);
            };
            write_tree(&file, &roots)?;
            println!("removed {}", removed.unique_id);
        }
    }
    Ok(0)
}

fn read_tree(path: &Path) -> Result<Vec<TreeNode>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid tree file {}", path.display()))
}

fn write_tree(path: &Path, roots: &[TreeNode]) -> Result<()> {
    let mut text = serde_json::to_string_pretty(roots)?;
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
