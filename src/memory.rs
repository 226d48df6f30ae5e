use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Activity, AttendanceRecord, AttendanceStatus, HealthReport, MedicalRecord, Member,
    NewHealthReport, PermissionSlip, SlipStatus, Team,
};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: Uuid,
    pub member_id: Uuid,
    pub status: String,
    pub activity_date: Option<String>,
}

/// In-process store with per-read failure and latency injection.
#[derive(Default)]
pub struct MemoryStore {
    pub teams: Vec<Team>,
    pub members: Vec<Member>,
    pub medical: Vec<MedicalRecord>,
    pub activities: Vec<Activity>,
    pub participants: Mutex<Vec<Participant>>,
    pub slips: Mutex<Vec<PermissionSlip>>,
    pub reports: Mutex<Vec<HealthReport>>,
    failing: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
    calls: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    pub fn failing(mut self, read: &'static str) -> Self {
        self.failing.insert(read);
        self
    }

    /// Makes `read` sleep for `delay` before answering.
    pub fn slow(mut self, read: &'static str, delay: Duration) -> Self {
        self.delays.insert(read, delay);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn add_team(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.teams.push(Team {
            id,
            name: name.to_string(),
            region: None,
            description: None,
        });
        id
    }

    pub fn add_member(&mut self, team_id: Uuid, full_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.members.push(Member {
            id,
            team_id,
            full_name: full_name.to_string(),
            date_of_birth: None,
        });
        id
    }

    pub fn add_attendance(&mut self, member_id: Uuid, status: &str, date: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.participants.get_mut().unwrap().push(Participant {
            id,
            member_id,
            status: status.to_string(),
            activity_date: Some(date.to_string()),
        });
        id
    }

    pub fn add_slip(&mut self, member_id: Uuid, status: SlipStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.slips.get_mut().unwrap().push(PermissionSlip {
            id,
            member_id,
            activity_name: "Spring camp".to_string(),
            activity_date: None,
            status,
        });
        id
    }

    pub fn add_activity(&mut self, title: &str, activity_date: NaiveDate) {
        self.activities.push(Activity {
            id: Uuid::new_v4(),
            team_id: None,
            title: title.to_string(),
            activity_date,
            start_time: None,
            end_time: None,
            location: None,
        });
    }

    async fn enter(&self, read: &'static str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(read);
        if let Some(delay) = self.delays.get(read) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(read) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count_members(&self) -> Result<i64, StoreError> {
        self.enter("count_members").await?;
        Ok(self.members.len() as i64)
    }

    async fn count_teams(&self) -> Result<i64, StoreError> {
        self.enter("count_teams").await?;
        Ok(self.teams.len() as i64)
    }

    async fn count_health_reports(&self) -> Result<i64, StoreError> {
        self.enter("count_health_reports").await?;
        Ok(self.reports.lock().unwrap().len() as i64)
    }

    async fn count_team_members(&self, team_id: Uuid) -> Result<i64, StoreError> {
        self.enter("count_team_members").await?;
        Ok(self.members.iter().filter(|m| m.team_id == team_id).count() as i64)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        self.enter("list_teams").await?;
        let mut teams = self.teams.clone();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn member_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        self.enter("member_ids").await?;
        Ok(self.members.iter().map(|m| m.id).collect())
    }

    async fn attendance_for_members(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.enter("attendance_for_members").await?;
        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .filter(|p| member_ids.contains(&p.member_id))
            .map(|p| AttendanceRecord {
                member_id: p.member_id,
                status: p.status.clone(),
                activity_date: p.activity_date.clone(),
            })
            .collect())
    }

    async fn find_team(&self, team_id: Uuid) -> Result<Option<Team>, StoreError> {
        self.enter("find_team").await?;
        Ok(self.teams.iter().find(|t| t.id == team_id).cloned())
    }

    async fn members_by_team(&self, team_id: Uuid) -> Result<Vec<Member>, StoreError> {
        self.enter("members_by_team").await?;
        let mut members: Vec<Member> = self
            .members
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(members)
    }

    async fn medical_records_for(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        self.enter("medical_records_for").await?;
        Ok(self
            .medical
            .iter()
            .filter(|r| member_ids.contains(&r.member_id))
            .cloned()
            .collect())
    }

    async fn permission_slips_for(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<PermissionSlip>, StoreError> {
        self.enter("permission_slips_for").await?;
        Ok(self
            .slips
            .lock()
            .unwrap()
            .iter()
            .filter(|s| member_ids.contains(&s.member_id))
            .cloned()
            .collect())
    }

    async fn health_reports_for_team(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<HealthReport>, StoreError> {
        self.enter("health_reports_for_team").await?;
        let mut reports: Vec<HealthReport> = self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.team_id == team_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn activities_from(
        &self,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        self.enter("activities_from").await?;
        let mut activities: Vec<Activity> = self
            .activities
            .iter()
            .filter(|a| a.activity_date >= from)
            .cloned()
            .collect();
        activities.sort_by_key(|a| a.activity_date);
        activities.truncate(limit.max(0) as usize);
        Ok(activities)
    }

    async fn find_permission_slip(
        &self,
        slip_id: Uuid,
    ) -> Result<Option<PermissionSlip>, StoreError> {
        self.enter("find_permission_slip").await?;
        Ok(self
            .slips
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == slip_id)
            .cloned())
    }

    async fn update_permission_slip_status(
        &self,
        slip_id: Uuid,
        status: SlipStatus,
    ) -> Result<(), StoreError> {
        self.enter("update_permission_slip_status").await?;
        if let Some(slip) = self.slips.lock().unwrap().iter_mut().find(|s| s.id == slip_id) {
            slip.status = status;
        }
        Ok(())
    }

    async fn update_attendance_status(
        &self,
        participant_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<bool, StoreError> {
        self.enter("update_attendance_status").await?;
        let mut participants = self.participants.lock().unwrap();
        match participants.iter_mut().find(|p| p.id == participant_id) {
            Some(participant) => {
                participant.status = status.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn register_participant(
        &self,
        activity_id: Uuid,
        member_id: Uuid,
    ) -> Result<Uuid, StoreError> {
        self.enter("register_participant").await?;
        let activity_date = self
            .activities
            .iter()
            .find(|a| a.id == activity_id)
            .map(|a| a.activity_date.to_string());
        let id = Uuid::new_v4();
        self.participants.lock().unwrap().push(Participant {
            id,
            member_id,
            status: AttendanceStatus::Registered.as_str().to_string(),
            activity_date,
        });
        Ok(id)
    }

    async fn insert_health_report(
        &self,
        report: NewHealthReport,
    ) -> Result<HealthReport, StoreError> {
        self.enter("insert_health_report").await?;
        let saved = HealthReport {
            id: Uuid::new_v4(),
            team_id: report.team_id,
            file_name: report.file_name,
            file_path: report.file_path,
            summary: report.summary,
            created_at: Utc::now(),
        };
        self.reports.lock().unwrap().push(saved.clone());
        Ok(saved)
    }
}
