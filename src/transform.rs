//! Cleaning and derived columns for the activity table.
//!
//! All of these run on the full table before it is filtered down to one
//! activity type, so every activity gets the same derived columns.

use chrono::{DateTime, NaiveDateTime};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::polyline;
use crate::table::{ActivityTable, Cell};

pub const START_DATE_LOCAL: &str = "start_date_local";
pub const START_TIME: &str = "start_time";
pub const AVERAGE_SPEED: &str = "average_speed";
pub const AVERAGE_SPEED_KMH: &str = "average_speed_kmh";
pub const AVERAGE_SPEED_MPH: &str = "average_speed_mph";
pub const SUMMARY_POLYLINE: &str = "map.summary_polyline";
pub const DECODED_POLYLINE: &str = "map.polyline";
pub const ACTIVITY_TYPE: &str = "type";
pub const DISTANCE: &str = "distance";
pub const NAME: &str = "name";

/// m/s to km/h
pub const KMH_PER_MPS: f64 = 3.6;
/// m/s to mph (rounded)
pub const MPH_PER_MPS: f64 = 2.237;

/// Identifiers, visibility flags and other bookkeeping columns with no use
/// for analysis.
pub const IRRELEVANT_COLUMNS: [&str; 20] = [
    SUMMARY_POLYLINE,
    "resource_state",
    "external_id",
    "upload_id",
    "location_city",
    "location_state",
    "has_kudoed",
    "start_date",
    "athlete.resource_state",
    "utc_offset",
    "map.resource_state",
    "athlete.id",
    "visibility",
    "heartrate_opt_out",
    "upload_id_str",
    "from_accepted_tag",
    "map.id",
    "manual",
    "private",
    "flagged",
];

/// What to do when a column scheduled for removal is not in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// Fail with [`Error::MissingField`]
    Strict,
    /// Skip it
    #[default]
    Lenient,
}

/// Run every cleaning step on the full table, in order.
pub fn transform(table: &mut ActivityTable, policy: DropPolicy) -> Result<()> {
    split_start_timestamp(table)?;
    add_speed_columns(table)?;
    decode_paths(table)?;
    let dropped = drop_columns(table, &IRRELEVANT_COLUMNS, policy)?;

    info!(
        "[Transform] {} activities, {} columns ({} dropped)",
        table.len(),
        table.columns().len(),
        dropped
    );
    Ok(())
}

/// Parse a local start timestamp, ignoring any offset.
///
/// Strava reports local wall-clock time with a `Z` suffix, so the offset
/// carries no meaning and the wall-clock fields are kept as written.
pub fn parse_local_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Replace `start_date_local` with its date and add a `start_time` column.
pub fn split_start_timestamp(table: &mut ActivityTable) -> Result<()> {
    let (dates, times): (Vec<Cell>, Vec<Cell>) = table
        .require_column(START_DATE_LOCAL)?
        .into_iter()
        .map(|cell| -> Result<(Cell, Cell)> {
            let raw = cell.as_str().ok_or_else(|| {
                Error::invalid_field(START_DATE_LOCAL, format!("expected a timestamp, got {cell}"))
            })?;
            let ts = parse_local_timestamp(raw).ok_or_else(|| {
                Error::invalid_field(START_DATE_LOCAL, format!("unparsable timestamp {raw:?}"))
            })?;
            Ok((Cell::Date(ts.date()), Cell::Time(ts.time())))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    table.set_column(START_DATE_LOCAL, dates)?;
    table.set_column(START_TIME, times)
}

/// Scale a speed in m/s. Null stays null.
fn scale_speed(cell: &Cell, factor: f64) -> Result<Cell> {
    match cell {
        Cell::Null => Ok(Cell::Null),
        Cell::Number(mps) => Ok(Cell::Number(mps * factor)),
        other => Err(Error::invalid_field(
            AVERAGE_SPEED,
            format!("expected a number, got {other}"),
        )),
    }
}

/// Add `average_speed_kmh` and `average_speed_mph` from `average_speed`.
pub fn add_speed_columns(table: &mut ActivityTable) -> Result<()> {
    let base = table.require_column(AVERAGE_SPEED)?;
    let kmh = base
        .iter()
        .map(|c| scale_speed(c, KMH_PER_MPS))
        .collect::<Result<Vec<_>>>()?;
    let mph = base
        .iter()
        .map(|c| scale_speed(c, MPH_PER_MPS))
        .collect::<Result<Vec<_>>>()?;

    table.set_column(AVERAGE_SPEED_KMH, kmh)?;
    table.set_column(AVERAGE_SPEED_MPH, mph)
}

/// Decode `map.summary_polyline` into a `map.polyline` column of points.
///
/// Activities without GPS (null or empty polyline) get an empty path.
pub fn decode_paths(table: &mut ActivityTable) -> Result<()> {
    let paths = table
        .require_column(SUMMARY_POLYLINE)?
        .into_iter()
        .map(|cell| -> Result<Cell> {
            match cell {
                Cell::Null => Ok(Cell::Path(Vec::new())),
                Cell::Text(encoded) => Ok(Cell::Path(polyline::decode(encoded)?)),
                other => Err(Error::invalid_field(
                    SUMMARY_POLYLINE,
                    format!("expected an encoded polyline, got {other}"),
                )),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    table.set_column(DECODED_POLYLINE, paths)
}

/// Remove the named columns. Returns how many were actually removed.
///
/// Under [`DropPolicy::Strict`] nothing is removed unless every column exists.
pub fn drop_columns(table: &mut ActivityTable, columns: &[&str], policy: DropPolicy) -> Result<usize> {
    if policy == DropPolicy::Strict {
        if let Some(missing) = columns.iter().find(|c| !table.has_column(c)) {
            return Err(Error::MissingField((*missing).to_string()));
        }
    }

    let mut dropped = 0;
    for column in columns {
        if table.drop_column(column) {
            dropped += 1;
        } else {
            debug!("[Transform] column {column} not present, skipping");
        }
    }
    Ok(dropped)
}

/// Keep only activities whose `type` equals `activity_type`, in their
/// original order.
pub fn filter_by_type(table: &ActivityTable, activity_type: &str) -> Result<ActivityTable> {
    if !table.has_column(ACTIVITY_TYPE) {
        return Err(Error::MissingField(ACTIVITY_TYPE.to_string()));
    }

    let filtered = table.filter_rows(|row| {
        row.get(ACTIVITY_TYPE).and_then(Cell::as_str) == Some(activity_type)
    });
    info!(
        "[Transform] {} of {} activities are of type {:?}",
        filtered.len(),
        table.len(),
        activity_type
    );
    Ok(filtered)
}

/// Index the table by its (already split) start date.
pub fn index_by_start_date(table: &mut ActivityTable) -> Result<()> {
    table.set_date_index(START_DATE_LOCAL)
}
