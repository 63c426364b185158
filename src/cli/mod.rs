use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "openclaw-config", version, about = "OpenClaw configuration manager")]
pub struct Cli {
    /// Configuration file to edit.
    #[arg(short, long, global = true, default_value = "openclaw.json", env = "OPENCLAW_CONFIG")]
    pub config: PathBuf,
    /// Directory for editor state (snapshot, theme).
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the document in canonical form.
    Show,
    /// Report validation problems and dangling model references.
    Validate,
    /// Print shell commands for managing a remote gateway host.
    Commands(CommandsOpts),
    /// Rename a provider and rewrite references to its models.
    RenameProvider(RenameOpts),
    /// Write the document with a fresh `meta.lastTouchedAt`.
    Export(ExportOpts),
    /// Manage the persisted snapshot.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
    /// Show or change the theme preference.
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeArg>,
    },
}

#[derive(clap::Args)]
pub struct CommandsOpts {
    /// Remote username.
    #[arg(short, long)]
    pub user: Option<String>,
    /// Remote base path, ending with a separator.
    #[arg(short, long)]
    pub path: Option<String>,
}

#[derive(clap::Args)]
pub struct RenameOpts {
    pub old: String,
    pub new: String,
}

#[derive(clap::Args)]
pub struct ExportOpts {
    /// Output file or directory; prints to stdout when omitted.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    /// Commit the current document and persist it.
    Save,
    /// Replace the document with the persisted snapshot.
    Restore {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Compare the document with the persisted snapshot.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
    Toggle,
}
