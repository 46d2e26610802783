use anyhow::Result;
use archival_automation::cli;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Logging may not be up yet (bad config), so report directly.
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
