//! CLI tool for arcgate archive sessions.

mod commands;
mod exit_codes;
mod output;
mod password;
mod stdio;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Read-only 7z and zip archive tool
#[derive(Parser)]
#[command(name = "arcgate")]
#[command(author, version, about = "Read-only 7z and zip archive tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress informational output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

/// How to open the archive.
#[derive(Args, Clone)]
pub struct OpenArgs {
    /// Archive file, or the first volume of a split archive
    archive: String,

    /// Password (will prompt if needed and not provided)
    #[arg(short = 'p', long, env = "ARCGATE_PASSWORD")]
    password: Option<String>,

    /// Treat the archive as the first volume of a split set
    #[arg(short = 'm', long)]
    multivolume: bool,

    /// Pick the format from the archive signature
    #[arg(long, conflicts_with = "force_type")]
    detect_type: bool,

    /// Archive type to assume, e.g. 7z or zip
    #[arg(long, value_name = "TYPE")]
    force_type: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show archive properties (alias: i)
    #[command(alias = "i")]
    Info {
        #[command(flatten)]
        open: OpenArgs,
    },

    /// Print the number of items
    Count {
        #[command(flatten)]
        open: OpenArgs,
    },

    /// List archive contents (alias: l)
    #[command(alias = "l")]
    List {
        #[command(flatten)]
        open: OpenArgs,

        /// Show item properties
        #[arg(long)]
        info: bool,

        /// Match without regard to case
        #[arg(long)]
        nocase: bool,

        /// Compare the pattern literally
        #[arg(long)]
        exact: bool,

        /// Only directories (d) or only files (f)
        #[arg(long = "type", value_enum)]
        item_type: Option<ItemType>,

        /// Glob pattern matched against full item paths
        pattern: Option<String>,
    },

    /// Extract a single item (alias: x)
    #[command(alias = "x")]
    Extract {
        #[command(flatten)]
        open: OpenArgs,

        /// Path of the item inside the archive
        item: String,

        /// Destination file
        #[arg(required_unless_present = "stdout")]
        destination: Option<PathBuf>,

        /// Write the item to standard output
        #[arg(long, conflicts_with = "destination")]
        stdout: bool,
    },

    /// List the archive types that can be opened
    Extensions,

    /// Evaluate protocol commands read from standard input
    Shell,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ItemType {
    /// Directories
    D,
    /// Files
    F,
}

impl From<ItemType> for arcgate::TypeFilter {
    fn from(item_type: ItemType) -> Self {
        match item_type {
            ItemType::D => arcgate::TypeFilter::Directories,
            ItemType::F => arcgate::TypeFilter::Files,
        }
    }
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Info { open } => commands::info(&open, cli.format, cli.quiet),

        Commands::Count { open } => commands::count(&open, cli.format, cli.quiet),

        Commands::List {
            open,
            info,
            nocase,
            exact,
            item_type,
            pattern,
        } => {
            let mut options = arcgate::ListOptions::new()
                .info(info)
                .nocase(nocase)
                .exact(exact);
            if let Some(item_type) = item_type {
                options = options.type_filter(item_type.into());
            }
            if let Some(pattern) = pattern {
                options = options.pattern(pattern);
            }
            commands::list(&open, &options, cli.format, cli.quiet)
        }

        Commands::Extract {
            open,
            item,
            destination,
            stdout,
        } => commands::extract(&commands::ExtractConfig {
            open: &open,
            item: &item,
            destination: destination.as_deref(),
            stdout,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Extensions => commands::extensions(cli.format),

        Commands::Shell => commands::shell(cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
