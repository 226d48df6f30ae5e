use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{StoreError, ViewError};
use crate::models::{
    Activity, AttendanceStatus, DashboardStats, HealthReport, MedicalRecord, Member,
    MonthlyAttendance, NamedMedicalRecord, NamedPermissionSlip, NewHealthReport, PermissionSlip,
    SlipStatus, SlipTransition, TeamFullData, TeamWithCount,
};
use crate::stats;
use crate::store::RecordStore;

pub const UPCOMING_LIMIT: i64 = 5;
pub const UNKNOWN_MEMBER: &str = "Unknown";

/// Assembles per-screen view models from store reads.
pub struct Views<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
    read_timeout: Duration,
}

impl<'a> Views<'a> {
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock, read_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            read_timeout,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn read<T, F>(&self, name: &'static str, read: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        debug!("reading {}", name);
        tokio::time::timeout(self.read_timeout, read)
            .await
            .unwrap_or(Err(StoreError::Timeout(name)))
    }

    /// Headline numbers. Each metric is read independently and falls back to 0
    /// on its own failure.
    pub async fn dashboard_stats(&self) -> DashboardStats {
        let today = self.today();
        let (total_scouts, active_teams, attendance_rate, health_reports_count) = tokio::join!(
            self.read("total scouts", self.store.count_members()),
            self.read("active teams", self.store.count_teams()),
            self.attendance_rate(today),
            self.read("health reports", self.store.count_health_reports()),
        );

        DashboardStats {
            total_scouts: or_default("total scouts", total_scouts),
            active_teams: or_default("active teams", active_teams),
            attendance_rate: or_default("attendance rate", attendance_rate),
            health_reports_count: or_default("health reports", health_reports_count),
        }
    }

    async fn attendance_rate(&self, today: NaiveDate) -> Result<u32, StoreError> {
        let member_ids = self.read("members", self.store.member_ids()).await?;
        if member_ids.is_empty() {
            return Ok(0);
        }
        let records = self
            .read("attendance", self.store.attendance_for_members(&member_ids))
            .await?;
        Ok(stats::attendance_rate(&member_ids, &records, today))
    }

    pub async fn attendance_trend(&self) -> Result<Vec<MonthlyAttendance>, StoreError> {
        let member_ids = self.read("members", self.store.member_ids()).await?;
        if member_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = self
            .read("attendance", self.store.attendance_for_members(&member_ids))
            .await?;
        Ok(stats::monthly_trend(&records, self.today()))
    }

    pub async fn upcoming_events(&self) -> Result<Vec<Activity>, StoreError> {
        self.read(
            "upcoming activities",
            self.store.activities_from(self.today(), UPCOMING_LIMIT),
        )
        .await
    }

    pub async fn teams_with_member_counts(&self) -> Result<Vec<TeamWithCount>, StoreError> {
        let teams = self.read("teams", self.store.list_teams()).await?;
        let counts = join_all(
            teams
                .iter()
                .map(|team| self.read("team member count", self.store.count_team_members(team.id))),
        )
        .await;

        Ok(teams
            .into_iter()
            .zip(counts)
            .map(|(team, count)| TeamWithCount {
                member_count: or_default("team member count", count),
                team,
            })
            .collect())
    }

    /// Team bundle for the team detail screen.
    ///
    /// A missing team is `ViewError::TeamNotFound`. Once the team exists, a
    /// failing dependent read leaves that collection empty.
    pub async fn team_full_data(&self, team_id: Uuid) -> Result<TeamFullData, ViewError> {
        let team = self
            .read("team", self.store.find_team(team_id))
            .await?
            .ok_or(ViewError::TeamNotFound(team_id))?;

        let members = or_default(
            "team members",
            self.read("team members", self.store.members_by_team(team_id)).await,
        );
        let member_ids: Vec<Uuid> = members.iter().map(|member| member.id).collect();

        let dependents = async {
            if member_ids.is_empty() {
                return (Vec::new(), Vec::new());
            }
            let (medical, slips) = tokio::join!(
                self.read("medical records", self.store.medical_records_for(&member_ids)),
                self.read("permission slips", self.store.permission_slips_for(&member_ids)),
            );
            (
                or_default("medical records", medical),
                or_default("permission slips", slips),
            )
        };
        let reports = self.read(
            "archived reports",
            self.store.health_reports_for_team(team_id),
        );
        let ((medical, slips), reports) = tokio::join!(dependents, reports);

        let names = member_names(&members);
        Ok(TeamFullData {
            medical_records: name_medical_records(&names, medical),
            permission_slips: name_permission_slips(&names, slips),
            archived_reports: or_default("archived reports", reports),
            team,
            members,
        })
    }

    /// Moves a slip to `status`. Repeating the current status writes nothing.
    pub async fn set_permission_slip_status(
        &self,
        slip_id: Uuid,
        status: SlipStatus,
    ) -> Result<SlipTransition, ViewError> {
        let slip = self
            .read("permission slip", self.store.find_permission_slip(slip_id))
            .await?
            .ok_or(ViewError::SlipNotFound(slip_id))?;

        let transition = slip
            .status
            .transition_to(status)
            .ok_or(ViewError::InvalidTransition {
                from: slip.status,
                to: status,
            })?;

        if transition == SlipTransition::Changed {
            self.read(
                "permission slip update",
                self.store.update_permission_slip_status(slip_id, status),
            )
            .await?;
            info!("permission slip {} moved {} -> {}", slip_id, slip.status, status);
        }

        Ok(transition)
    }

    pub async fn record_attendance(
        &self,
        participant_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<(), ViewError> {
        let updated = self
            .read(
                "attendance update",
                self.store.update_attendance_status(participant_id, status),
            )
            .await?;
        if !updated {
            return Err(ViewError::ParticipantNotFound(participant_id));
        }
        Ok(())
    }

    pub async fn register_participant(
        &self,
        activity_id: Uuid,
        member_id: Uuid,
    ) -> Result<Uuid, ViewError> {
        Ok(self
            .read(
                "participant registration",
                self.store.register_participant(activity_id, member_id),
            )
            .await?)
    }

    /// Appends report metadata to the team's archive.
    pub async fn archive_health_report(
        &self,
        report: NewHealthReport,
    ) -> Result<HealthReport, ViewError> {
        let team_id = report.team_id;
        self.read("team", self.store.find_team(team_id))
            .await?
            .ok_or(ViewError::TeamNotFound(team_id))?;

        let saved = self
            .read("health report insert", self.store.insert_health_report(report))
            .await?;
        info!("archived health report {} for team {}", saved.file_name, team_id);
        Ok(saved)
    }
}

fn or_default<T: Default>(metric: &str, result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|err| {
        warn!("{} unavailable, using default: {}", metric, err);
        T::default()
    })
}

pub fn member_names(members: &[Member]) -> HashMap<Uuid, &str> {
    members
        .iter()
        .map(|member| (member.id, member.full_name.as_str()))
        .collect()
}

fn display_name(names: &HashMap<Uuid, &str>, member_id: &Uuid) -> String {
    names
        .get(member_id)
        .copied()
        .unwrap_or(UNKNOWN_MEMBER)
        .to_string()
}

pub fn name_medical_records(
    names: &HashMap<Uuid, &str>,
    records: Vec<MedicalRecord>,
) -> Vec<NamedMedicalRecord> {
    records
        .into_iter()
        .map(|record| NamedMedicalRecord {
            member_name: display_name(names, &record.member_id),
            record,
        })
        .collect()
}

pub fn name_permission_slips(
    names: &HashMap<Uuid, &str>,
    slips: Vec<PermissionSlip>,
) -> Vec<NamedPermissionSlip> {
    slips
        .into_iter()
        .map(|slip| NamedPermissionSlip {
            member_name: display_name(names, &slip.member_id),
            slip,
        })
        .collect()
}
