//! CLI frontend for the Statforge character statistics engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "statforge",
    about = "Statforge: derived character statistics from declarative rules",
    version,
    propagate_version = true
)]
struct Cli {
    /// Content catalog JSON (default: the bundled sample catalog)
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the content catalog and report issues
    Check,

    /// Show the computed statistics of a character
    Show {
        /// Character selection file (JSON)
        file: PathBuf,
    },

    /// List the unmet prerequisites of a character
    Validate {
        /// Character selection file (JSON)
        file: PathBuf,
    },

    /// Repair a character until its prerequisites hold
    Repair {
        /// Character selection file (JSON)
        file: PathBuf,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Write the repaired character here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a random character, or fill one category of an existing one
    Random {
        /// Only fill this category (e.g. skills, edges, weapons)
        #[arg(long)]
        category: Option<String>,

        /// Character to start from (default: an empty character)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Write the character here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the compiled rules of a trait
    Notes {
        /// Trait name (e.g. "Arcane Background")
        name: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = cli.catalog.as_deref();
    let result = match cli.command {
        Commands::Check => commands::check::run(catalog),
        Commands::Show { file } => commands::show::run(catalog, &file),
        Commands::Validate { file } => commands::validate::run(catalog, &file),
        Commands::Repair { file, seed, output } => {
            commands::repair::run(catalog, &file, seed, output.as_deref())
        }
        Commands::Random {
            category,
            input,
            seed,
            output,
        } => commands::random::run(
            catalog,
            category.as_deref(),
            input.as_deref(),
            seed,
            output.as_deref(),
        ),
        Commands::Notes { name } => commands::notes::run(catalog, &name),
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "error:".red().bold());
        process::exit(1);
    }
}
