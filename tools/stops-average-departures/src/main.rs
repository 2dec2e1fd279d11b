use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod frequency;
mod source;

use frequency::{average_departures, write_stops_with_averages};
use source::FeedSource;

#[derive(Parser, Debug)]
#[command(
    name = "stops-average-departures",
    author,
    version,
    about = "Add the average number of departures per day to every stop of a GTFS feed",
    long_about = "Counts, for every stop, how many stop times it serves over the whole \
                  feed period and divides by the number of distinct dates in \
                  calendar_dates.txt.\n\n\
                  The result is written as a copy of stops.txt with an extra \
                  avg_stop_times column."
)]
struct Args {
    /// GTFS feed: an extracted directory, a .zip file or an http(s) URL of one
    #[arg(short, long)]
    input: String,

    /// Output stops file
    #[arg(short, long, default_value = "stops.txt")]
    output: PathBuf,

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

    let feed = FeedSource::parse(&args.input);
    if source::overwrites_input(&feed, &args.output) {
        bail!("Refusing to overwrite the input stops.txt");
    }

    log::info!("Input: {}", args.input);
    let tables = source::open(&feed).context("Failed to open the feed")?;
    let averages = average_departures(tables.root()).context("Failed to count departures")?;

    log::info!("Writing results to {}", args.output.display());
    let written = write_stops_with_averages(tables.root(), &args.output, &averages)
        .context("Failed to write stops")?;

    log::info!("Done! {written} stops written to {}", args.output.display());
    Ok(())
}
