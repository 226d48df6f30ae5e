use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Activity, AttendanceRecord, AttendanceStatus, HealthReport, MedicalRecord, Member,
    NewHealthReport, PermissionSlip, SlipStatus, Team,
};
use crate::store::RecordStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, today: NaiveDate) -> anyhow::Result<()> {
    let teams = vec![
        (
            Uuid::parse_str("6f1c2a9e-5b1d-4c53-9a3e-1d2b7c4e8f01")?,
            "Falcon Patrol",
            "North",
        ),
        (
            Uuid::parse_str("a83d4e27-0c6b-4f8e-b1d2-93e5f7a1c602")?,
            "Cedar Troop",
            "Coast",
        ),
    ];

    let mut team_ids = Vec::new();
    for (id, name, region) in teams {
        let team_id: Uuid = sqlx::query(
            r#"
            INSERT INTO scouting.teams (id, name, region)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET region = EXCLUDED.region
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(region)
        .fetch_one(pool)
        .await?
        .get("id");
        team_ids.push(team_id);
    }

    let members = vec![
        (team_ids[0], "Amina Haddad", Some(("O+", "Peanuts"))),
        (team_ids[0], "Leo Brandt", None),
        (team_ids[0], "Sara Okafor", Some(("A-", ""))),
        (team_ids[1], "Tomas Reyes", Some(("B+", "Bee stings"))),
        (team_ids[1], "Nadia Kim", None),
    ];

    let mut member_ids = Vec::new();
    for (team_id, full_name, medical) in members {
        let member_id: Uuid = sqlx::query(
            r#"
            INSERT INTO scouting.members (id, team_id, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id, full_name) DO UPDATE SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(full_name)
        .fetch_one(pool)
        .await?
        .get("id");

        if let Some((blood_type, allergies)) = medical {
            sqlx::query(
                r#"
                INSERT INTO scouting.medical_records (id, member_id, blood_type, allergies)
                VALUES ($1, $2, $3, NULLIF($4, ''))
                ON CONFLICT (member_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(member_id)
            .bind(blood_type)
            .bind(allergies)
            .execute(pool)
            .await?;
        }

        member_ids.push((team_id, member_id));
    }

    let activities = vec![
        ("seed-hike", "Ridge hike", -60, team_ids[0]),
        ("seed-knots", "Knot workshop", -30, team_ids[0]),
        ("seed-canoe", "Canoe practice", -7, team_ids[1]),
        ("seed-camp", "Spring camp", 7, team_ids[0]),
        ("seed-firstaid", "First aid drill", 21, team_ids[1]),
    ];

    for (index, (source_key, title, offset, team_id)) in activities.into_iter().enumerate() {
        let activity_date = today + Duration::days(offset);
        let activity_id: Uuid = sqlx::query(
            r#"
            INSERT INTO scouting.activities (id, team_id, title, activity_date, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO UPDATE SET activity_date = EXCLUDED.activity_date
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(title)
        .bind(activity_date)
        .bind(source_key)
        .fetch_one(pool)
        .await?
        .get("id");

        for (position, (member_team, member_id)) in member_ids.iter().enumerate() {
            if *member_team != team_id {
                continue;
            }
            let status = if offset > 0 {
                AttendanceStatus::Registered
            } else if (index + position) % 3 == 0 {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Attended
            };

            sqlx::query(
                r#"
                INSERT INTO scouting.activity_participants (id, activity_id, member_id, attendance_status)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (activity_id, member_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(activity_id)
            .bind(member_id)
            .bind(status.as_str())
            .execute(pool)
            .await?;
        }

        if offset > 0 {
            for (member_team, member_id) in &member_ids {
                if *member_team != team_id {
                    continue;
                }
                sqlx::query(
                    r#"
                    INSERT INTO scouting.permission_slips (id, member_id, activity_name, activity_date)
                    SELECT $1, $2, $3, $4
                    WHERE NOT EXISTS (
                        SELECT 1 FROM scouting.permission_slips
                        WHERE member_id = $2 AND activity_name = $3
                    )
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(member_id)
                .bind(title)
                .bind(activity_date)
                .execute(pool)
                .await?;
            }
        }
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct AttendanceCsvRow {
    pub team: String,
    pub full_name: String,
    pub activity: String,
    pub activity_date: NaiveDate,
    pub attendance_status: String,
}

/// Reads every row and checks its status before anything is written.
pub fn read_attendance_rows<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> anyhow::Result<Vec<(AttendanceCsvRow, AttendanceStatus)>> {
    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<AttendanceCsvRow>().enumerate() {
        let row = result.with_context(|| format!("row {}: malformed record", line + 1))?;
        let status = AttendanceStatus::parse(&row.attendance_status).with_context(|| {
            format!(
                "row {}: unknown attendance status {:?}",
                line + 1,
                row.attendance_status
            )
        })?;
        rows.push((row, status));
    }
    Ok(rows)
}

/// Imports participation rows keyed by member name and activity title.
///
/// The whole file is applied in one transaction.
pub async fn import_attendance_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let rows = read_attendance_rows(csv::Reader::from_path(csv_path)?)?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for (row, status) in rows {
        let team_id: Uuid = sqlx::query(
            r#"
            INSERT INTO scouting.teams (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.team)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        let member_id: Uuid = sqlx::query(
            r#"
            INSERT INTO scouting.members (id, team_id, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id, full_name) DO UPDATE SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(&row.full_name)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        let source_key = format!("import-{}-{}", row.activity, row.activity_date);
        let activity_id: Uuid = sqlx::query(
            r#"
            INSERT INTO scouting.activities (id, team_id, title, activity_date, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO UPDATE SET title = EXCLUDED.title
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(&row.activity)
        .bind(row.activity_date)
        .bind(source_key)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        let result = sqlx::query(
            r#"
            INSERT INTO scouting.activity_participants
            (id, activity_id, member_id, attendance_status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (activity_id, member_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(activity_id)
        .bind(member_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(sql).fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }
}

fn team_from_row(row: &PgRow) -> Result<Team, StoreError> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        region: row.try_get("region")?,
        description: row.try_get("description")?,
    })
}

fn slip_from_row(row: &PgRow) -> Result<PermissionSlip, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(PermissionSlip {
        id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        activity_name: row.try_get("activity_name")?,
        activity_date: row.try_get("activity_date")?,
        status: SlipStatus::parse(&status).ok_or(StoreError::Decode {
            column: "permission_slips.status",
            value: status,
        })?,
    })
}

fn report_from_row(row: &PgRow) -> Result<HealthReport, StoreError> {
    Ok(HealthReport {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        file_name: row.try_get("file_name")?,
        file_path: row.try_get("file_path")?,
        summary: row.try_get("summary")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl RecordStore for PgStore {
    async fn count_members(&self) -> Result<i64, StoreError> {
        self.count("SELECT COUNT(*) AS count FROM scouting.members").await
    }

    async fn count_teams(&self) -> Result<i64, StoreError> {
        self.count("SELECT COUNT(*) AS count FROM scouting.teams").await
    }

    async fn count_health_reports(&self) -> Result<i64, StoreError> {
        self.count("SELECT COUNT(*) AS count FROM scouting.team_health_reports")
            .await
    }

    async fn count_team_members(&self, team_id: Uuid) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM scouting.members WHERE team_id = $1")
            .bind(team_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, region, description FROM scouting.teams ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn member_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query("SELECT id FROM scouting.members")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<Uuid, _>("id").map_err(StoreError::from))
            .collect()
    }

    async fn attendance_for_members(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT p.member_id, p.attendance_status, a.activity_date::text AS activity_date \
             FROM scouting.activity_participants p \
             LEFT JOIN scouting.activities a ON a.id = p.activity_id \
             WHERE p.member_id = ANY($1)",
        )
        .bind(member_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(AttendanceRecord {
                member_id: row.try_get("member_id")?,
                status: row.try_get("attendance_status")?,
                activity_date: row.try_get("activity_date")?,
            });
        }
        Ok(records)
    }

    async fn find_team(&self, team_id: Uuid) -> Result<Option<Team>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, region, description FROM scouting.teams WHERE id = $1",
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(team_from_row).transpose()
    }

    async fn members_by_team(&self, team_id: Uuid) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, team_id, full_name, date_of_birth FROM scouting.members \
             WHERE team_id = $1 ORDER BY full_name",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            members.push(Member {
                id: row.try_get("id")?,
                team_id: row.try_get("team_id")?,
                full_name: row.try_get("full_name")?,
                date_of_birth: row.try_get("date_of_birth")?,
            });
        }
        Ok(members)
    }

    async fn medical_records_for(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, member_id, blood_type, allergies, medical_conditions, \
             doctor_name, doctor_phone, last_checkup \
             FROM scouting.medical_records WHERE member_id = ANY($1)",
        )
        .bind(member_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(MedicalRecord {
                id: row.try_get("id")?,
                member_id: row.try_get("member_id")?,
                blood_type: row.try_get("blood_type")?,
                allergies: row.try_get("allergies")?,
                medical_conditions: row.try_get("medical_conditions")?,
                doctor_name: row.try_get("doctor_name")?,
                doctor_phone: row.try_get("doctor_phone")?,
                last_checkup: row.try_get("last_checkup")?,
            });
        }
        Ok(records)
    }

    async fn permission_slips_for(
        &self,
        member_ids: &[Uuid],
    ) -> Result<Vec<PermissionSlip>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, member_id, activity_name, activity_date, status \
             FROM scouting.permission_slips WHERE member_id = ANY($1)",
        )
        .bind(member_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(slip_from_row).collect()
    }

    async fn health_reports_for_team(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<HealthReport>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, team_id, file_name, file_path, summary, created_at \
             FROM scouting.team_health_reports WHERE team_id = $1 ORDER BY created_at DESC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn activities_from(
        &self,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Activity>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, team_id, title, activity_date, start_time, end_time, location \
             FROM scouting.activities WHERE activity_date >= $1 \
             ORDER BY activity_date ASC, start_time ASC NULLS LAST LIMIT $2",
        )
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut activities = Vec::with_capacity(rows.len());
        for row in rows {
            activities.push(Activity {
                id: row.try_get("id")?,
                team_id: row.try_get("team_id")?,
                title: row.try_get("title")?,
                activity_date: row.try_get("activity_date")?,
                start_time: row.try_get("start_time")?,
                end_time: row.try_get("end_time")?,
                location: row.try_get("location")?,
            });
        }
        Ok(activities)
    }

    async fn find_permission_slip(
        &self,
        slip_id: Uuid,
    ) -> Result<Option<PermissionSlip>, StoreError> {
        let row = sqlx::query(
            "SELECT id, member_id, activity_name, activity_date, status \
             FROM scouting.permission_slips WHERE id = $1",
        )
        .bind(slip_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(slip_from_row).transpose()
    }

    async fn update_permission_slip_status(
        &self,
        slip_id: Uuid,
        status: SlipStatus,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE scouting.permission_slips SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(slip_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_attendance_status(
        &self,
        participant_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE scouting.activity_participants SET attendance_status = $2 WHERE id = $1",
        )
        .bind(participant_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn register_participant(
        &self,
        activity_id: Uuid,
        member_id: Uuid,
    ) -> Result<Uuid, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO scouting.activity_participants (id, activity_id, member_id, attendance_status)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(activity_id)
        .bind(member_id)
        .bind(AttendanceStatus::Registered.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn insert_health_report(
        &self,
        report: NewHealthReport,
    ) -> Result<HealthReport, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO scouting.team_health_reports (id, team_id, file_name, file_path, summary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, team_id, file_name, file_path, summary, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(report.team_id)
        .bind(&report.file_name)
        .bind(&report.file_path)
        .bind(&report.summary)
        .fetch_one(&self.pool)
        .await?;
        report_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "team,full_name,activity,activity_date,attendance_status\n";

    #[test]
    fn csv_rows_map_legacy_statuses() {
        let data = format!(
            "{HEADER}Falcon Patrol,Amina Haddad,Orienteering,2026-01-17,late\n\
             Falcon Patrol,Leo Brandt,Orienteering,2026-01-17,absent\n"
        );
        let rows = read_attendance_rows(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, AttendanceStatus::Attended);
        assert_eq!(rows[1].0.full_name, "Leo Brandt");
    }

    #[test]
    fn unknown_status_rejects_whole_file() {
        let data = format!(
            "{HEADER}Falcon Patrol,Amina Haddad,Orienteering,2026-01-17,attended\n\
             Falcon Patrol,Leo Brandt,Orienteering,2026-01-17,teleported\n"
        );
        let err = read_attendance_rows(csv::Reader::from_reader(data.as_bytes())).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn bad_date_rejects_whole_file() {
        let data = format!("{HEADER}Falcon Patrol,Amina Haddad,Orienteering,soon,attended\n");
        let err = read_attendance_rows(csv::Reader::from_reader(data.as_bytes())).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
