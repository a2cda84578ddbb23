use crate::{
    data::{ActivityRecord, CumulativePoint, DailyMileage, Error},
    read::ActivityUser,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::debug;

/// This is where the filtered activities of one year are collected while reading. Single
/// threaded, nothing here is shared.
#[derive(Debug)]
pub(crate) struct YearLog {
    pub year: i32,
    pub records: Vec<ActivityRecord>,
}

impl YearLog {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn daily(&self) -> Result<Vec<DailyMileage>, Error> {
        daily_mileage(&self.records, self.year)
    }
}

impl ActivityUser for YearLog {
    fn use_activity(&mut self, activity: ActivityRecord) {
        self.records.push(activity);
    }
}

/// Every calendar day of `year`, January 1st to December 31st.
pub(crate) fn days_of_year(year: i32) -> Result<Vec<NaiveDate>, Error> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(Error::InvalidYear(year))?;
    NaiveDate::from_ymd_opt(year, 12, 31).ok_or(Error::InvalidYear(year))?;
    Ok(first
        .iter_days()
        .take_while(|day| day.year() == year)
        .collect())
}

/// One entry per day of `year`: same-day activities are summed, idle days get zero.
///
/// Records are sorted first, so a day keeps the timestamp of its earliest activity. Records
/// from other years are ignored.
pub(crate) fn daily_mileage(
    records: &[ActivityRecord],
    year: i32,
) -> Result<Vec<DailyMileage>, Error> {
    let days = days_of_year(year)?;

    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.date);

    let mut by_day: BTreeMap<NaiveDate, DailyMileage> = BTreeMap::new();
    for record in sorted {
        let day = record.date.date();
        match by_day.entry(day) {
            Entry::Occupied(mut entry) => {
                let daily = entry.get_mut();
                daily.mileage = daily
                    .mileage
                    .checked_add(record.mileage)
                    .ok_or(Error::MileageOverflow(day))?;
            }
            Entry::Vacant(entry) => {
                entry.insert(DailyMileage {
                    date: record.date,
                    mileage: record.mileage,
                });
            }
        }
    }
    debug!(active_days = by_day.len(), year, "grouped activities by day");

    Ok(days
        .into_iter()
        .map(|day| {
            by_day.get(&day).copied().unwrap_or(DailyMileage {
                date: day.and_time(chrono::NaiveTime::MIN),
                mileage: Decimal::ZERO,
            })
        })
        .collect())
}

/// Running totals over `daily`, in the same order. Totals are exact; round only when
/// presenting them.
pub(crate) fn cumulative(daily: &[DailyMileage]) -> Result<Vec<CumulativePoint>, Error> {
    let mut total = Decimal::ZERO;
    daily
        .iter()
        .map(|day| {
            total = total
                .checked_add(day.mileage)
                .ok_or(Error::MileageOverflow(day.date.date()))?;
            Ok(CumulativePoint {
                date: day.date,
                mileage: day.mileage,
                total_mileage: total,
            })
        })
        .collect()
}
