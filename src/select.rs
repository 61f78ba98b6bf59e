//! Picking the one activity to draw.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use log::debug;

use crate::error::{Error, Result};
use crate::table::ActivityTable;
use crate::transform::{
    AVERAGE_SPEED_KMH, AVERAGE_SPEED_MPH, DECODED_POLYLINE, DISTANCE, NAME, START_DATE_LOCAL,
    START_TIME,
};
use crate::GpsPoint;

/// Which activity to select from the filtered table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RideSelection {
    /// Greatest `distance`. Ties go to the earliest row in table order.
    Longest,
    /// Latest start date and time. Ties go to the earliest row in table order.
    #[default]
    Last,
}

impl RideSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideSelection::Longest => "longest",
            RideSelection::Last => "last",
        }
    }
}

impl fmt::Display for RideSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "longest" => Ok(RideSelection::Longest),
            "last" => Ok(RideSelection::Last),
            other => Err(Error::Config(format!(
                "unknown ride selection {other:?}, expected \"longest\" or \"last\""
            ))),
        }
    }
}

/// One activity pulled out of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedActivity {
    /// Row position in the table it was selected from
    pub row: usize,
    pub start_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub name: Option<String>,
    /// Meters
    pub distance: Option<f64>,
    pub average_speed_kmh: Option<f64>,
    pub average_speed_mph: Option<f64>,
    pub path: Vec<GpsPoint>,
}

/// Start date of a row: the index label if the table is indexed, otherwise
/// the `start_date_local` column.
fn start_date(table: &ActivityTable, row: usize) -> Option<NaiveDate> {
    table
        .label(row)
        .or_else(|| table.get(row, START_DATE_LOCAL).as_date())
}

/// Row with the greatest value of `key`. Rows without a key are skipped and
/// ties keep the first row seen.
fn first_max_by_key<K, F>(len: usize, mut key: F) -> Option<usize>
where
    K: PartialOrd,
    F: FnMut(usize) -> Option<K>,
{
    let mut best: Option<(usize, K)> = None;
    for row in 0..len {
        let Some(k) = key(row) else { continue };
        let better = best.as_ref().map_or(true, |(_, current)| k > *current);
        if better {
            best = Some((row, k));
        }
    }
    best.map(|(row, _)| row)
}

impl RideSelection {
    /// Pick one row from `table`.
    ///
    /// `activity_type` only labels the error when the table is empty.
    pub fn select(&self, table: &ActivityTable, activity_type: &str) -> Result<SelectedActivity> {
        if table.is_empty() {
            return Err(Error::NoActivities {
                activity_type: activity_type.to_string(),
            });
        }

        let row = match self {
            RideSelection::Longest => {
                first_max_by_key(table.len(), |i| table.get(i, DISTANCE).as_f64())
                    .ok_or_else(|| Error::invalid_field(DISTANCE, "no activity has a distance"))?
            }
            RideSelection::Last => first_max_by_key(table.len(), |i| {
                start_date(table, i).map(|d| (d, table.get(i, START_TIME).as_time()))
            })
            .ok_or_else(|| Error::MissingField(START_DATE_LOCAL.to_string()))?,
        };

        debug!("[Select] {self} picked row {row} of {}", table.len());
        extract(table, row)
    }
}

fn extract(table: &ActivityTable, row: usize) -> Result<SelectedActivity> {
    let start_date =
        start_date(table, row).ok_or_else(|| Error::MissingField(START_DATE_LOCAL.to_string()))?;
    let path = table
        .get(row, DECODED_POLYLINE)
        .as_path()
        .ok_or_else(|| Error::MissingField(DECODED_POLYLINE.to_string()))?
        .to_vec();

    Ok(SelectedActivity {
        row,
        start_date,
        start_time: table.get(row, START_TIME).as_time(),
        name: table.get(row, NAME).as_str().map(str::to_string),
        distance: table.get(row, DISTANCE).as_f64(),
        average_speed_kmh: table.get(row, AVERAGE_SPEED_KMH).as_f64(),
        average_speed_mph: table.get(row, AVERAGE_SPEED_MPH).as_f64(),
        path,
    })
}
