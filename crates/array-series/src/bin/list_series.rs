//! Prints the series described by a JSON config.
//!
//! Usage: `cargo run --bin list-series -- series.json`
//!
//! Set `RUST_LOG=debug` to see how the anchor range was derived.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use array_series::{Result, SeriesConfig};

fn main() -> ExitCode {
    env_logger::init();

    let Some(config_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: list-series <config.json>");
        return ExitCode::from(2);
    };

    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("list-series: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &Path) -> Result<()> {
    let config = SeriesConfig::load(config_path)?;
    let series = config.open()?;
    println!(
        "{} series of `{}` in {} (anchors {}..{} step {})",
        series.len(),
        series.pattern(),
        series.shape().directory().display(),
        series.ind_start(),
        series.ind_stop(),
        series.ind_step()
    );
    for serie in series.iter() {
        let serie = serie?;
        let anchor = serie.anchor().unwrap_or_default();
        println!("i={anchor}: {}", serie.file_names().join(" "));
    }
    Ok(())
}
