use crate::data::{
    ActivityRecord, Error, DATE_COLUMN, DISTANCE_COLUMN, KM_TO_MILES, TIMESTAMP_FORMAT,
    TYPE_COLUMN,
};
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use std::{fs::File, path::Path, str::FromStr};
use tracing::debug;

/// Trait for doing something with an `ActivityRecord` that passed the filter. Used by the
/// aggregation to collect a year of activities, but also by tests to check what the reader
/// lets through.
pub(crate) trait ActivityUser {
    fn use_activity(&mut self, activity: ActivityRecord);
}

/// Which rows to keep: the activity type is compared verbatim, case included.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Filter<'a> {
    pub year: i32,
    pub activity_type: &'a str,
}

pub(crate) fn open_input(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|source| Error::InputNotFound {
        path: path.to_owned(),
        source,
    })
}

/// CSV importer for activity exports. The first row is a header and is never looked at.
/// Any row that matches the activity type must carry a valid timestamp, and any row that
/// also matches the year must carry a numeric distance; otherwise the whole read fails.
pub(crate) fn read_activities<R: std::io::Read, U: ActivityUser>(
    reader: R,
    filter: &Filter,
    user: &mut U,
) -> Result<(), Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let mut skipped = 0usize;
    for result in rdr.records() {
        let row = result?;
        let line = row.position().map_or(0, |p| p.line());

        if column(&row, TYPE_COLUMN, line)? != filter.activity_type {
            skipped += 1;
            continue;
        }

        let raw_date = column(&row, DATE_COLUMN, line)?;
        let date = NaiveDateTime::parse_from_str(raw_date, TIMESTAMP_FORMAT).map_err(|_| {
            Error::BadTimestamp {
                line,
                value: raw_date.to_owned(),
            }
        })?;
        if date.year() != filter.year {
            skipped += 1;
            continue;
        }

        let raw_distance = column(&row, DISTANCE_COLUMN, line)?;
        let mileage = parse_distance(raw_distance)
            .and_then(|kilometers| kilometers.checked_mul(KM_TO_MILES))
            .ok_or_else(|| Error::BadDistance {
                line,
                value: raw_distance.to_owned(),
            })?;
        user.use_activity(ActivityRecord { date, mileage });
    }
    debug!(skipped, "finished reading activities");
    Ok(())
}

fn column<'r>(row: &'r csv::StringRecord, index: usize, line: u64) -> Result<&'r str, Error> {
    row.get(index).ok_or(Error::MissingColumn {
        line,
        column: index,
    })
}

fn parse_distance(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
