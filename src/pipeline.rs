//! End-to-end run: fetch, tidy, select, render.
//!
//! The network stages live behind the `http` feature; [`process`] takes the
//! raw activity records so the rest of the run works on any JSON source.

use std::path::PathBuf;

use log::info;
use serde_json::Value;

use crate::config::RideOptions;
use crate::error::Result;
use crate::geo_utils::polyline_length;
use crate::render::RideMap;
use crate::select::SelectedActivity;
use crate::table::ActivityTable;
use crate::transform::{filter_by_type, index_by_start_date, transform};

#[cfg(feature = "http")]
use crate::{config::Config, http::StravaClient};

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Activities returned by the API
    pub fetched: usize,
    /// Activities left after filtering by type
    pub matching: usize,
    pub selected: SelectedActivity,
    /// Length of the drawn route in meters
    pub route_length: f64,
    pub map: RideMap,
    pub output: PathBuf,
}

/// Clean the full table, then keep the requested activity type indexed by
/// start date.
pub fn prepare_rides(mut table: ActivityTable, options: &RideOptions) -> Result<ActivityTable> {
    transform(&mut table, options.drop_policy)?;
    let mut rides = filter_by_type(&table, &options.activity_type)?;
    index_by_start_date(&mut rides)?;
    Ok(rides)
}

/// Turn raw activity records into a saved map.
pub fn process(records: &[Value], options: &RideOptions) -> Result<RunSummary> {
    let table = ActivityTable::from_records(records)?;
    let fetched = table.len();

    let rides = prepare_rides(table, options)?;
    let selected = options.which_ride.select(&rides, &options.activity_type)?;
    let route_length = polyline_length(&selected.path);
    info!(
        "[Pipeline] Selected {} {} from {}: {:?}, {:.1} km route, {} points",
        options.which_ride,
        options.activity_type,
        selected.start_date,
        selected.name.as_deref().unwrap_or("unnamed"),
        route_length / 1000.0,
        selected.path.len()
    );

    let map = RideMap::for_activity(&selected)?;
    map.save(&options.output)?;

    Ok(RunSummary {
        fetched,
        matching: rides.len(),
        selected,
        route_length,
        map,
        output: options.output.clone(),
    })
}

/// Authenticate, fetch one page of activities and render the selected one.
#[cfg(feature = "http")]
pub async fn run(config: &Config) -> Result<RunSummary> {
    let client = StravaClient::new(config.endpoints.clone())?;
    let token = client.authenticate(&config.credentials).await?;
    let records = client.fetch_activities(&token).await?;
    info!("[Pipeline] Fetched {} activities", records.len());

    process(&records, &config.options)
}
