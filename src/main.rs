use clap::Parser;
use annotation_locator::cli::commands::{cmd_fingerprint, cmd_resolve};
use annotation_locator::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Resolve {
            page,
            location,
            from_x,
            from_y,
            format,
            trace,
            right_boundary,
        } => {
            cmd_resolve(
                &page,
                &location,
                (from_x, from_y),
                &format,
                trace.as_deref(),
                right_boundary,
                &config,
            )
            .await?;
        }
        Commands::Fingerprint {
            page,
            selector,
            version,
        } => {
            cmd_fingerprint(&page, &selector, version)?;
        }
    }

    Ok(())
}

/// RUST_LOG wins; otherwise -v/-vv/-vvv raise the level from warn.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
