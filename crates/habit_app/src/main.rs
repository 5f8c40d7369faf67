use clap::Parser;
use habit_app::app::{run, AppConfig, Cli, Command};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().unwrap_or_default();
    config.apply_cli(&cli);
    let command = cli.command.unwrap_or(Command::List);
    if let Err(err) = run(config, command) {
        eprintln!("momentum: {err:#}");
        std::process::exit(1);
    }
}
