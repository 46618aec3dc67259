mod cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pixir::generator::{register_builtin_generators, GeneratorRegistry};

#[derive(Parser)]
#[command(
    name = "pixir",
    version,
    about = "pixir: image pipeline generators with vector load alignment"
)]
struct Cli {
    /// Log every alignment decision (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a generator's pipeline for one or more targets and emit it
    Generate(cli::generate::GenerateArgs),
    /// List registered generators
    List,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let registry = GeneratorRegistry::global();
    if let Err(e) = register_builtin_generators(registry) {
        cli::fail(&e, None);
    }

    match cli.command {
        Command::Generate(args) => cli::generate::cmd_generate(args, registry),
        Command::List => cli::list::cmd_list(registry),
    }
}
