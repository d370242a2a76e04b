//! infrabind CLI — bind infrastructure programs against package schemas.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "infrabind",
    version,
    about = "Bind declarative infrastructure programs into a typed model and describe it per language"
)]
struct Cli {
    /// Log binder activity (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: infrabind::cli::Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "infrabind=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = infrabind::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
