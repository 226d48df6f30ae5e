use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub region: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub team_id: Uuid,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_phone: Option<String>,
    pub last_checkup: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub team_id: Option<Uuid>,
    pub title: String,
    pub activity_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
}

/// One participation row as read for aggregation.
///
/// Status and date are kept as stored text: rows with an unknown status or an
/// unparseable date are skipped by the aggregation functions instead of failing
/// the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub member_id: Uuid,
    pub status: String,
    pub activity_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Registered,
    Attended,
    Absent,
    Excused,
}

impl AttendanceStatus {
    /// Parses canonical names and the legacy `present/late/pending` spellings.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "registered" | "pending" => Some(Self::Registered),
            "attended" | "present" | "late" => Some(Self::Attended),
            "absent" => Some(Self::Absent),
            "excused" => Some(Self::Excused),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Attended => "attended",
            Self::Absent => "absent",
            Self::Excused => "excused",
        }
    }

    /// Counts toward the attendance denominator.
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Registered)
    }

    pub fn counts_as_attended(self) -> bool {
        matches!(self, Self::Attended)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SlipStatus {
    Pending,
    Approved,
    Denied,
}

impl SlipStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

/// Outcome of moving a permission slip to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipTransition {
    Changed,
    Unchanged,
}

impl SlipStatus {
    /// Decided slips must go back to pending before flipping decision.
    /// Returns `None` for `approved <-> denied`.
    pub fn transition_to(self, next: SlipStatus) -> Option<SlipTransition> {
        match (self, next) {
            (current, next) if current == next => Some(SlipTransition::Unchanged),
            (Self::Pending, _) | (_, Self::Pending) => Some(SlipTransition::Changed),
            _ => None,
        }
    }
}

impl fmt::Display for SlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSlip {
    pub id: Uuid,
    pub member_id: Uuid,
    pub activity_name: String,
    pub activity_date: Option<NaiveDate>,
    pub status: SlipStatus,
}

/// Archived health report metadata. Rows are insert-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub id: Uuid,
    pub team_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHealthReport {
    pub team_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_scouts: i64,
    pub active_teams: i64,
    pub attendance_rate: u32,
    pub health_reports_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAttendance {
    pub year: i32,
    pub month: u32,
    pub rate: u32,
    pub records: usize,
}

impl MonthlyAttendance {
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|date| date.format("%b %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedMedicalRecord {
    pub member_name: String,
    #[serde(flatten)]
    pub record: MedicalRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPermissionSlip {
    pub member_name: String,
    #[serde(flatten)]
    pub slip: PermissionSlip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFullData {
    pub team: Team,
    pub members: Vec<Member>,
    pub medical_records: Vec<NamedMedicalRecord>,
    pub permission_slips: Vec<NamedPermissionSlip>,
    pub archived_reports: Vec<HealthReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamWithCount {
    #[serde(flatten)]
    pub team: Team,
    pub member_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipStatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_attendance_spellings_map_to_canonical() {
        assert_eq!(AttendanceStatus::parse("present"), Some(AttendanceStatus::Attended));
        assert_eq!(AttendanceStatus::parse("late"), Some(AttendanceStatus::Attended));
        assert_eq!(AttendanceStatus::parse("Excused"), Some(AttendanceStatus::Excused));
        assert_eq!(AttendanceStatus::parse("pending"), Some(AttendanceStatus::Registered));
        assert_eq!(AttendanceStatus::parse("maybe"), None);
    }

    #[test]
    fn registered_is_not_resolved() {
        assert!(!AttendanceStatus::Registered.is_resolved());
        assert!(AttendanceStatus::Excused.is_resolved());
        assert!(!AttendanceStatus::Excused.counts_as_attended());
    }

    #[test]
    fn pending_slip_can_be_approved_or_denied() {
        assert_eq!(
            SlipStatus::Pending.transition_to(SlipStatus::Approved),
            Some(SlipTransition::Changed)
        );
        assert_eq!(
            SlipStatus::Pending.transition_to(SlipStatus::Denied),
            Some(SlipTransition::Changed)
        );
    }

    #[test]
    fn repeating_a_decision_is_a_no_op() {
        assert_eq!(
            SlipStatus::Approved.transition_to(SlipStatus::Approved),
            Some(SlipTransition::Unchanged)
        );
    }

    #[test]
    fn decisions_cannot_flip_without_reset() {
        assert_eq!(SlipStatus::Approved.transition_to(SlipStatus::Denied), None);
        assert_eq!(SlipStatus::Denied.transition_to(SlipStatus::Approved), None);
        assert_eq!(
            SlipStatus::Denied.transition_to(SlipStatus::Pending),
            Some(SlipTransition::Changed)
        );
    }

    #[test]
    fn month_label_is_short_name_and_year() {
        let bucket = MonthlyAttendance {
            year: 2026,
            month: 3,
            rate: 50,
            records: 2,
        };
        assert_eq!(bucket.label(), "Mar 2026");
    }
}
