use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Activity, AttendanceRecord, AttendanceStatus, HealthReport, MedicalRecord, Member,
    NewHealthReport, PermissionSlip, SlipStatus, Team,
};

/// Read/write contract of the record store.
///
/// Implementations must keep referential integrity on delete: removing a team
/// or member removes (or refuses while present) every dependent row.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn count_members(&self) -> Result<i64, StoreError>;

    async fn count_teams(&self) -> Result<i64, StoreError>;

    async fn count_health_reports(&self) -> Result<i64, StoreError>;

    async fn count_team_members(&self, team_id: Uuid) -> Result<i64, StoreError>;

    /// Teams ordered by name.
    async fn list_teams(&self) -> Result<Vec<Team>, StoreError>;

    async fn member_ids(&self) -> Result<Vec<Uuid>, StoreError>;

    async fn attendance_for_members(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn find_team(&self, team_id: Uuid) -> Result<Option<Team>, StoreError>;

    /// Members ordered by full name.
    async fn members_by_team(&self, team_id: Uuid) -> Result<Vec<Member>, StoreError>;

    async fn medical_records_for(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<MedicalRecord>, StoreError>;

    async fn permission_slips_for(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<PermissionSlip>, StoreError>;

    /// Newest first.
    async fn health_reports_for_team(&self, team_id: Uuid)
        -> Result<Vec<HealthReport>, StoreError>;

    /// Activities dated on or after `from`, earliest first.
    async fn activities_from(
        &self,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError>;

    async fn find_permission_slip(
        &self,
        slip_id: Uuid,
    ) -> Result<Option<PermissionSlip>, StoreError>;

    async fn update_permission_slip_status(
        &self,
        slip_id: Uuid,
        status: SlipStatus,
    ) -> Result<(), StoreError>;

    /// Returns `false` when no participation row has this id.
    async fn update_attendance_status(
        &self,
        participant_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<bool, StoreError>;

    async fn register_participant(
        &self,
        activity_id: Uuid,
        member_id: Uuid,
    ) -> Result<Uuid, StoreError>;

    async fn insert_health_report(
        &self,
        report: NewHealthReport,
    ) -> Result<HealthReport, StoreError>;
}
