use clap::{Args, Parser, Subcommand, ValueEnum};
use sorta::cli::{SortaCommand, resolve_drop_folder, run_cli_with_config};
use sorta::logging;
use sorta::output::OutputFormatter;
use sorta::rule_store::RuleKind;
use std::path::PathBuf;
use std::process::ExitCode;

/// sorta moves the entries of a drop folder to the right place. The
/// destination is chosen by name prefix first, then by extension.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sweep settings file (TOML); defaults to .sortarc.toml or the user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DropFolderArgs {
    /// Path of the drop folder
    #[arg(long, default_value = ".")]
    path: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty drop folder or reset an existing one
    Init {
        #[command(flatten)]
        folder: DropFolderArgs,
    },

    /// Sort the entries of the drop folder
    Sort {
        #[command(flatten)]
        folder: DropFolderArgs,

        /// Show where entries would go without moving anything
        #[arg(long, conflicts_with = "daemon")]
        dry_run: bool,

        /// Keep running and sort whenever the drop folder changes
        #[arg(short = 'D', long)]
        daemon: bool,
    },

    /// Add a sorting rule
    Add {
        /// Kind of rule
        #[arg(value_enum)]
        kind: RuleKindArg,

        /// The prefix or the extension (without the dot)
        name: String,

        /// Existing directory the matching entries are moved to
        destination: String,

        #[command(flatten)]
        folder: DropFolderArgs,
    },

    /// Remove a sorting rule
    Rm {
        #[arg(value_enum)]
        kind: RuleKindArg,

        name: String,

        #[command(flatten)]
        folder: DropFolderArgs,
    },

    /// Show the drop folder's settings and rules
    List {
        #[command(flatten)]
        folder: DropFolderArgs,
    },

    /// Move the entries of the last sort back into the drop folder
    Undo {
        #[command(flatten)]
        folder: DropFolderArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RuleKindArg {
    Prefix,
    Ext,
}

impl From<RuleKindArg> for RuleKind {
    fn from(arg: RuleKindArg) -> Self {
        match arg {
            RuleKindArg::Prefix => RuleKind::Prefix,
            RuleKindArg::Ext => RuleKind::Extension,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let (command, folder) = match cli.command {
        Commands::Init { folder } => (SortaCommand::Init, folder),
        Commands::Sort {
            folder,
            dry_run,
            daemon,
        } => (SortaCommand::Sort { dry_run, daemon }, folder),
        Commands::Add {
            kind,
            name,
            destination,
            folder,
        } => (
            SortaCommand::Add {
                kind: kind.into(),
                name,
                destination,
            },
            folder,
        ),
        Commands::Rm { kind, name, folder } => (
            SortaCommand::Remove {
                kind: kind.into(),
                name,
            },
            folder,
        ),
        Commands::List { folder } => (SortaCommand::List, folder),
        Commands::Undo { folder } => (SortaCommand::Undo, folder),
    };

    let drop_folder = resolve_drop_folder(&folder.path)?;
    run_cli_with_config(command, &drop_folder, cli.config.as_deref())
}
