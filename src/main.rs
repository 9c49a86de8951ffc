use clap::Parser;
use tracing_subscriber::EnvFilter;

use contig_scaffolder::cli::{self, Cli, Commands};
use contig_scaffolder::web;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("contig_scaffolder=debug,info")
    } else {
        EnvFilter::new("contig_scaffolder=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Info(args) => {
            cli::info::run(args, cli.format, cli.verbose)?;
        }
        Commands::Frame(args) => {
            cli::frame::run(args, cli.format, cli.verbose)?;
        }
        Commands::Edit(args) => {
            cli::edit::run(args, cli.format, cli.verbose)?;
        }
        Commands::Export(args) => {
            cli::export::run(args, cli.format, cli.verbose)?;
        }
        Commands::Serve(args) => {
            web::server::run(args)?;
        }
    }

    Ok(())
}
