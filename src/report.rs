use std::fmt::Write;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{Activity, DashboardStats, MonthlyAttendance, TeamFullData};
use crate::stats;

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => "-",
    }
}

pub fn build_dashboard_report(
    today: NaiveDate,
    stats: &DashboardStats,
    trend: &[MonthlyAttendance],
    upcoming: &[Activity],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Scouting Dashboard");
    let _ = writeln!(output, "Generated {}", today);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total scouts: {}", stats.total_scouts);
    let _ = writeln!(output, "- Active teams: {}", stats.active_teams);
    let _ = writeln!(output, "- Median attendance: {}%", stats.attendance_rate);
    let _ = writeln!(output, "- Archived health reports: {}", stats.health_reports_count);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Trend");

    if trend.is_empty() {
        let _ = writeln!(output, "No resolved attendance recorded yet.");
    } else {
        for bucket in trend {
            let _ = writeln!(
                output,
                "- {}: {}% across {} records",
                bucket.label(),
                bucket.rate,
                bucket.records
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Events");

    if upcoming.is_empty() {
        let _ = writeln!(output, "Nothing scheduled.");
    } else {
        for activity in upcoming {
            let time = activity
                .start_time
                .map(|start| format!(" {}", start.format("%H:%M")))
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {}{}: {} ({})",
                activity.activity_date,
                time,
                activity.title,
                or_dash(activity.location.as_deref())
            );
        }
    }

    output
}

pub fn build_team_report(data: &TeamFullData) -> String {
    let mut output = String::new();
    let team = &data.team;

    let _ = writeln!(output, "# {}", team.name);
    let _ = writeln!(output, "Region: {}", or_dash(team.region.as_deref()));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Roster ({} members)", data.members.len());

    if data.members.is_empty() {
        let _ = writeln!(output, "No members enrolled.");
    } else {
        for member in &data.members {
            let born = member
                .date_of_birth
                .map(|date| date.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(output, "- {} (born {})", member.full_name, born);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Medical Records");

    if data.medical_records.is_empty() {
        let _ = writeln!(output, "No medical records on file.");
    } else {
        let _ = writeln!(output, "| Name | Blood | Allergies | Conditions | Doctor |");
        let _ = writeln!(output, "| --- | --- | --- | --- | --- |");
        for named in &data.medical_records {
            let record = &named.record;
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} {} |",
                named.member_name,
                or_dash(record.blood_type.as_deref()),
                or_dash(record.allergies.as_deref()),
                or_dash(record.medical_conditions.as_deref()),
                or_dash(record.doctor_name.as_deref()),
                or_dash(record.doctor_phone.as_deref())
            );
        }
    }

    let counts = stats::slip_status_counts(
        data.permission_slips.iter().map(|named| named.slip.status),
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Permission Slips");
    let _ = writeln!(
        output,
        "{} pending, {} approved, {} denied",
        counts.pending, counts.approved, counts.denied
    );
    for named in &data.permission_slips {
        let _ = writeln!(
            output,
            "- {}: {} ({})",
            named.member_name, named.slip.activity_name, named.slip.status
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Archived Health Reports");

    if data.archived_reports.is_empty() {
        let _ = writeln!(output, "No reports archived.");
    } else {
        for report in &data.archived_reports {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                report.file_name,
                report.created_at.format("%Y-%m-%d"),
                report.summary
            );
        }
    }

    output
}

/// Short summary stored alongside an archived report.
pub fn health_summary(data: &TeamFullData) -> String {
    let with_allergies = stats::count_matching(&data.medical_records, |named| {
        named
            .record
            .allergies
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    });
    let with_conditions = stats::count_matching(&data.medical_records, |named| {
        named
            .record
            .medical_conditions
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    });
    let missing = data
        .members
        .len()
        .saturating_sub(data.medical_records.len());

    format!(
        "{} members, {} with allergies, {} with medical conditions, {} without a medical record",
        data.members.len(),
        with_allergies,
        with_conditions,
        missing
    )
}

/// Name reduced to ASCII letters, digits and `_`, safe as a single path component.
pub fn file_slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if slug.trim_matches('_').is_empty() {
        "team".to_string()
    } else {
        slug
    }
}

pub fn archive_file_name(team_name: &str, created_at: DateTime<Utc>, report_id: Uuid) -> String {
    format!(
        "{}_Health_Report_{}_{}.md",
        file_slug(team_name),
        created_at.format("%Y%m%d%H%M%S%3f"),
        report_id.simple()
    )
}

/// Creates `path` holding `contents`. An existing file is an error, never replaced.
pub fn write_new_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(contents.as_bytes())
}
