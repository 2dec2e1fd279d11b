use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod boundary;
mod stops;

use boundary::read_boundaries;
use stops::{output_path, tag_stops};

#[derive(Parser, Debug)]
#[command(
    name = "stops-municipality",
    author,
    version,
    about = "Append the containing municipality to every stop name of a GTFS stops file",
    long_about = "Looks up every stop in a GeoJSON file of municipality boundaries and \
                  renames it to \"<stop name> (<municipality>)\".\n\n\
                  Boundary files from osm-boundaries.com work as is: the official_name \
                  property is used, falling back to name. The result is written next to \
                  the input as <stem>_with_municipalities.txt."
)]
struct Args {
    /// Input GTFS stops file
    #[arg(short, long)]
    input: PathBuf,

    /// GeoJSON feature collection of municipality boundaries
    #[arg(short, long)]
    boundaries: PathBuf,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    if !args.input.exists() {
        bail!("Input file does not exist: {}", args.input.display());
    }

    let boundaries = read_boundaries(&args.boundaries).context("Failed to read boundaries")?;
    log::info!("Loaded {} municipality boundaries", boundaries.len());

    let output = output_path(&args.input);
    let stats = tag_stops(&args.input, &output, &boundaries).context("Failed to tag stops")?;

    log::info!("Matched {} of {} stops", stats.matched, stats.stops);
    if stats.without_coordinates > 0 {
        log::warn!("{} stops have no usable coordinates", stats.without_coordinates);
    }
    log::info!("Done! Output can be found at {}", output.display());
    Ok(())
}
