use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, AttendanceStatus, MonthlyAttendance, SlipStatus, SlipStatusCounts,
};

pub const TREND_MONTHS: usize = 6;

pub fn count_matching<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|item| predicate(item)).count()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn parse_activity_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    // Timestamps such as "2026-03-14T09:00:00Z" still carry the date first.
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Keeps records inside the aggregation window with a resolved status.
///
/// Records with an unknown status or a missing/unparseable date are dropped.
fn resolved_in_window(
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> impl Iterator<Item = (&AttendanceRecord, AttendanceStatus, NaiveDate)> {
    records.iter().filter_map(move |record| {
        let date = parse_activity_date(record.activity_date.as_deref())?;
        if date > today {
            return None;
        }
        let status = AttendanceStatus::parse(&record.status)?;
        status.is_resolved().then_some((record, status, date))
    })
}

pub fn member_rates(
    member_ids: &[Uuid],
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> HashMap<Uuid, f64> {
    let mut per_member: HashMap<Uuid, (usize, usize)> =
        member_ids.iter().map(|id| (*id, (0, 0))).collect();

    for (record, status, _) in resolved_in_window(records, today) {
        let Some(entry) = per_member.get_mut(&record.member_id) else {
            continue;
        };
        entry.1 += 1;
        if status.counts_as_attended() {
            entry.0 += 1;
        }
    }

    per_member
        .into_iter()
        .map(|(id, (attended, total))| (id, percentage(attended, total)))
        .collect()
}

/// Median of per-member attendance percentages, rounded to a whole percent.
///
/// Every id in `member_ids` takes part, so members without resolved records
/// contribute a 0% rate.
pub fn attendance_rate(member_ids: &[Uuid], records: &[AttendanceRecord], today: NaiveDate) -> u32 {
    let rates: Vec<f64> = member_rates(member_ids, records, today).into_values().collect();
    median(&rates).round().clamp(0.0, 100.0) as u32
}

pub fn monthly_trend(records: &[AttendanceRecord], today: NaiveDate) -> Vec<MonthlyAttendance> {
    let mut buckets: BTreeMap<(i32, u32), (usize, usize)> = BTreeMap::new();

    for (_, status, date) in resolved_in_window(records, today) {
        let entry = buckets.entry((date.year(), date.month())).or_insert((0, 0));
        entry.1 += 1;
        if status.counts_as_attended() {
            entry.0 += 1;
        }
    }

    let skip = buckets.len().saturating_sub(TREND_MONTHS);
    buckets
        .into_iter()
        .skip(skip)
        .map(|((year, month), (attended, total))| MonthlyAttendance {
            year,
            month,
            rate: percentage(attended, total).round() as u32,
            records: total,
        })
        .collect()
}

pub fn slip_status_counts(statuses: impl IntoIterator<Item = SlipStatus>) -> SlipStatusCounts {
    statuses
        .into_iter()
        .fold(SlipStatusCounts::default(), |mut counts, status| {
            match status {
                SlipStatus::Pending => counts.pending += 1,
                SlipStatus::Approved => counts.approved += 1,
                SlipStatus::Denied => counts.denied += 1,
            }
            counts
        })
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
