// CLI module for handling command-line interface

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "goup")]
#[command(version, about = "Install and manage the Go toolchain")]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print full error diagnostics
    #[arg(
        long,
        global = true,
        env = "GOUP_DEBUG",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available releases, oldest first
    List {
        /// Ignore the cached listing and fetch it again
        #[arg(long)]
        refresh: bool,
    },
    /// Install a release
    Install(InstallArgs),
    /// Copy the project template into the current directory
    Init,
    /// Show the installed Go version
    Version,
}

#[derive(Args)]
#[command(group = clap::ArgGroup::new("method").required(true).args(["binary", "source"]))]
pub struct InstallArgs {
    /// Install a prebuilt binary archive
    #[arg(long)]
    pub binary: bool,

    /// Build from source
    #[arg(long)]
    pub source: bool,

    /// Release to install: 1.21.0, go1.21.0 or latest
    #[arg(long, required_if_eq("binary", "true"))]
    pub version: Option<String>,

    /// Expected sha256 of the archive
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}
