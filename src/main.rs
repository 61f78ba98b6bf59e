//! ride-map: draw a recent Strava ride on a map.
//!
//! Usage:
//! ```bash
//! # Credentials from the environment or a .env file
//! export STRAVA_CLIENT_ID=12345
//! export STRAVA_CLIENT_SECRET=...
//! export STRAVA_REFRESH_TOKEN=...
//!
//! # Most recent ride to ride_map.html
//! ride-map
//!
//! # Longest run to a custom file
//! ride-map --which-ride longest --activity-type Run --output run.html
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};

use ride_map::config::{load_env_file, Config};
use ride_map::{pipeline, DropPolicy, RideSelection};

#[derive(Parser)]
#[command(
    name = "ride-map",
    version,
    about = "Fetch Strava activities and render one ride's route as an HTML map"
)]
struct Cli {
    /// Which ride to draw: "last" or "longest" (overrides RIDE_MAP_WHICH_RIDE)
    #[arg(long)]
    which_ride: Option<RideSelection>,

    /// Activity type to keep (overrides RIDE_MAP_ACTIVITY_TYPE)
    #[arg(long)]
    activity_type: Option<String>,

    /// HTML output path (overrides RIDE_MAP_OUTPUT)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Fail if a column scheduled for removal is missing
    #[arg(long)]
    strict_columns: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Enable debug logging when RUST_LOG is not set
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(which_ride) = self.which_ride {
            config.options.which_ride = which_ride;
        }
        if let Some(activity_type) = self.activity_type {
            config.options.activity_type = activity_type;
        }
        if let Some(output) = self.output {
            config.options.output = output;
        }
        if self.strict_columns {
            config.options.drop_policy = DropPolicy::Strict;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before the logger, so RUST_LOG may come from the env file
    let env_file = load_env_file(cli.env_file.as_deref());

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match env_file {
        Ok(Some(path)) => debug!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    match pipeline::run(&config).await {
        Ok(summary) => {
            let ride = &summary.selected;
            info!(
                "Kept {} of {} activities as {:?}",
                summary.matching, summary.fetched, config.options.activity_type
            );
            println!(
                "{} ({}): {:.2} km, {:.1} km/h, route {:.2} km",
                ride.name.as_deref().unwrap_or("unnamed"),
                ride.start_date,
                ride.distance.unwrap_or(0.0) / 1000.0,
                ride.average_speed_kmh.unwrap_or(0.0),
                summary.route_length / 1000.0
            );
            println!("Map saved to {}", summary.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
