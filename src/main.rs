use clap::{Parser, Subcommand};
use regtrust::coordinator::{self, ScanOptions};
use std::process;

#[derive(Parser)]
#[command(name = "regtrust", about = "Pre-install security auditor for public registry packages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a package specifier before installing it
    Scan {
        /// Package specifier: name, name@version, @scope/name, a local path, or a .tgz/.tar.gz file
        specifier: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Skip the repository health probe
        #[arg(long)]
        no_github: bool,

        /// Skip the source-diff engine
        #[arg(long)]
        no_diff: bool,
    },
    /// Whitelist a package so future scans skip it
    Allow {
        /// Package name to whitelist
        package: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Scan { specifier, json, no_github, no_diff } => {
            cmd_scan(&specifier, ScanOptions { json, no_github, no_diff })
        }
        Commands::Allow { package } => cmd_allow(&package),
    };

    process::exit(exit_code);
}

fn cmd_scan(specifier: &str, opts: ScanOptions) -> i32 {
    match coordinator::run(specifier, &opts) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("regtrust: error: {e}");
            2
        }
    }
}

fn cmd_allow(package: &str) -> i32 {
    match coordinator::allow(package) {
        Ok(()) => {
            eprintln!("Whitelisted: {package}");
            0
        }
        Err(e) => {
            eprintln!("regtrust: error: {e}");
            1
        }
    }
}
