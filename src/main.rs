//! Bulkshift CLI: `convert` an image tree to AVIF or `download` a URL list, batch by batch.

use anyhow::Result;
use bulkshift::engine::arg_parser::Cli;
use bulkshift::engine::{RunExit, handle_run};
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let exit = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    if exit != RunExit::Success {
        std::process::exit(exit.code());
    }
    Ok(())
}
