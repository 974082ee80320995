use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trust",
    about = "Little Footsteps trust desk: hash-chained ledger and static portal",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./trust.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the ledger with its genesis block
    Init,
    /// Append an entry to the ledger
    Append(AppendArgs),
    /// Verify chain integrity from genesis to tip
    Verify,
    /// Show recent blocks, newest first
    Log(LogArgs),
    /// Show one block
    Show(ShowArgs),
    /// Export the chain as a JSON array
    Export(PathArgs),
    /// Create a new ledger from an exported JSON array
    Import(PathArgs),
    /// Move a corrupt ledger aside so a fresh chain can start
    Quarantine,
    /// Drop an incomplete final record left by a crash
    Repair,
    /// Remove a stale lock left by a crashed writer
    Unlock,
    /// Post a communiqué to the portal
    Post(PostArgs),
    /// List open intake requests
    Requests,
    /// Pay out against an intake request
    Disburse(DisburseArgs),
    /// Acknowledge requests that are already paid on the ledger
    Reconcile,
    /// Set the desk alert level
    Alert(AlertArgs),
    /// Show the derived balance
    Balance,
    /// Regenerate the portal and explorer pages
    Render,
    /// Add the explorer link to an existing portal page
    LinkExplorer,
    /// Run a menu action by number (1 post, 2 disburse, 3 alert)
    Action(ActionArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    /// Free-text entry
    #[arg(required_unless_present = "movement", conflicts_with = "movement")]
    pub text: Option<String>,
    /// Structured movement: DESCRIPTION AMOUNT
    #[arg(long, num_args = 2, value_names = ["DESCRIPTION", "AMOUNT"], allow_hyphen_values = true)]
    pub movement: Option<Vec<String>>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    pub index: u64,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct PostArgs {
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,
}

#[derive(Args)]
pub struct DisburseArgs {
    pub id: u64,
    pub amount: String,
}

#[derive(Args)]
pub struct AlertArgs {
    /// green, amber, red (or 1, 2, 3)
    pub level: String,
}

#[derive(Args)]
pub struct ActionArgs {
    pub code: u8,
    /// Action arguments: MESSAGE..., ID AMOUNT, or LEVEL
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
