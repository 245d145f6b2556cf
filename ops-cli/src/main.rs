use clap::Parser;
use config_engine::NicareConfig;
use logger_redacted::{init_tracing, LogOutput};
use ops_cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NicareConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level_override() {
        config.logging.level = level.to_string();
    }
    // stdout carries the command output
    config.logging.output = LogOutput::Stderr;
    init_tracing(&config.logging)?;

    let output = run(&cli, &config).await?;
    println!("{output}");
    Ok(())
}
