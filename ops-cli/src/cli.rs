use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "nicare", version, about = "NiCare engine operations")]
pub struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// YAML configuration file layered over the defaults
    #[arg(long, global = true, env = "NICARE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Log level forced by the command line, if any
    pub fn log_level_override(&self) -> Option<&'static str> {
        self.verbose.then_some("debug")
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Bulk enrollee import
    #[command(subcommand)]
    Import(ImportCommand),
    /// Premium PIN inventory
    #[command(subcommand)]
    Pins(PinsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML
    Show,
}

#[derive(Subcommand, Debug)]
pub enum ImportCommand {
    /// Validate import rows and print the report as JSON
    Validate(ImportValidateArgs),
}

#[derive(Args, Debug)]
pub struct ImportValidateArgs {
    /// JSON array of row objects keyed by column header
    #[arg(long)]
    pub file: PathBuf,

    /// JSON array of facilities to register before validating
    #[arg(long)]
    pub facilities: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum PinsCommand {
    /// Generate a PIN batch and print it as JSON
    Generate(PinsGenerateArgs),
}

#[derive(Args, Debug)]
pub struct PinsGenerateArgs {
    #[arg(long)]
    pub count: usize,

    /// Face value of each PIN
    #[arg(long)]
    pub amount: Decimal,

    /// Family premium instead of individual
    #[arg(long)]
    pub family: bool,
}
