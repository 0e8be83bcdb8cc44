use clap::Parser;
use stepchart::cli::commands::Cli;
use stepchart::cli::handlers;

fn main() {
    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli.command, cli.json, cli.project_dir.as_deref()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
