/// Meeting model and database operations
///
/// Meetings have a time range, a type and a status, a creator and a set of
/// participants (`meeting_participants`). The creator is always a
/// participant.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE meeting_type AS ENUM ('online', 'offline', 'hybrid');
/// CREATE TYPE meeting_status AS ENUM ('scheduled', 'in_progress', 'completed', 'cancelled');
///
/// CREATE TABLE meetings (
///     id UUID PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     start_time TIMESTAMPTZ NOT NULL,
///     end_time TIMESTAMPTZ NOT NULL,
///     location VARCHAR(255),
///     meeting_type meeting_type NOT NULL DEFAULT 'offline',
///     status meeting_status NOT NULL DEFAULT 'scheduled',
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     ...
///     CONSTRAINT meetings_time_range CHECK (end_time > start_time)
/// );
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::user::UserSummary;

const MEETING_COLUMNS: &str = "id, title, description, start_time, end_time, location, \
     meeting_type, status, created_by, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meeting_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MeetingType {
    Online,
    #[default]
    Offline,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meeting_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::InProgress => "in_progress",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub meeting_type: MeetingType,
    pub status: MeetingStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Meeting counters for one participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeetingStatistics {
    pub total: i64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
    /// In the future and still scheduled
    pub upcoming: i64,
    pub completed: i64,
}

#[derive(Debug, Clone)]
pub struct CreateMeeting {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub meeting_type: MeetingType,
    pub status: MeetingStatus,
    pub created_by: Uuid,
    pub participant_ids: Vec<Uuid>,
}

/// Partial meeting update. `participant_ids: Some(_)` replaces the set
/// (the creator is re-added).
#[derive(Debug, Clone, Default)]
pub struct UpdateMeeting {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<Option<String>>,
    pub meeting_type: Option<MeetingType>,
    pub status: Option<MeetingStatus>,
    pub participant_ids: Option<Vec<Uuid>>,
}

/// UTC boundaries of the calendar day, ISO week and month containing `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindows {
    pub day: (DateTime<Utc>, DateTime<Utc>),
    pub week: (DateTime<Utc>, DateTime<Utc>),
    pub month: (DateTime<Utc>, DateTime<Utc>),
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl CalendarWindows {
    pub fn around(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();

        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));

        let month_start = today.with_day(1).unwrap_or(today);
        let next_month = if month_start.month() == 12 {
            NaiveDate::from_ymd_opt(month_start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(month_start.year(), month_start.month() + 1, 1)
        }
        .unwrap_or(month_start + Duration::days(31));

        Self {
            day: (start_of(today), start_of(today + Duration::days(1))),
            week: (start_of(week_start), start_of(week_start + Duration::days(7))),
            month: (start_of(month_start), start_of(next_month)),
        }
    }
}

async fn replace_participants(
    tx: &mut Transaction<'_, Postgres>,
    meeting_id: Uuid,
    creator_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    let mut ids = user_ids.to_vec();
    if !ids.contains(&creator_id) {
        ids.push(creator_id);
    }

    sqlx::query("DELETE FROM meeting_participants WHERE meeting_id = $1")
        .bind(meeting_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO meeting_participants (meeting_id, user_id)
        SELECT $1, participant FROM UNNEST($2::uuid[]) AS participant
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(meeting_id)
    .bind(&ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl Meeting {
    pub async fn create(pool: &PgPool, data: CreateMeeting) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let meeting = sqlx::query_as::<_, Meeting>(&format!(
            r#"
            INSERT INTO meetings
                (id, title, description, start_time, end_time, location, meeting_type, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.title)
        .bind(data.description)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.location)
        .bind(data.meeting_type)
        .bind(data.status)
        .bind(data.created_by)
        .fetch_one(&mut *tx)
        .await?;

        replace_participants(&mut tx, meeting.id, meeting.created_by, &data.participant_ids).await?;

        tx.commit().await?;

        Ok(meeting)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meeting>(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Meetings the user participates in, soonest first
    pub async fn list_for_participant(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meeting>(&format!(
            r#"
            SELECT {MEETING_COLUMNS}
            FROM meetings
            WHERE EXISTS (
                SELECT 1 FROM meeting_participants mp
                WHERE mp.meeting_id = meetings.id AND mp.user_id = $1
            )
            ORDER BY start_time
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// The user's meetings starting within `[from, to)`
    pub async fn list_for_participant_between(
        pool: &PgPool,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meeting>(&format!(
            r#"
            SELECT {MEETING_COLUMNS}
            FROM meetings
            WHERE start_time >= $2 AND start_time < $3
              AND EXISTS (
                  SELECT 1 FROM meeting_participants mp
                  WHERE mp.meeting_id = meetings.id AND mp.user_id = $1
              )
            ORDER BY start_time
            "#
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateMeeting,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE meetings SET updated_at = NOW()");
        let mut bind_count = 1;

        for (present, column) in [
            (data.title.is_some(), "title"),
            (data.description.is_some(), "description"),
            (data.start_time.is_some(), "start_time"),
            (data.end_time.is_some(), "end_time"),
            (data.location.is_some(), "location"),
            (data.meeting_type.is_some(), "meeting_type"),
            (data.status.is_some(), "status"),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {MEETING_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Meeting>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(start_time) = data.start_time {
            q = q.bind(start_time);
        }
        if let Some(end_time) = data.end_time {
            q = q.bind(end_time);
        }
        if let Some(location) = data.location {
            q = q.bind(location);
        }
        if let Some(meeting_type) = data.meeting_type {
            q = q.bind(meeting_type);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let mut tx = pool.begin().await?;

        let Some(meeting) = q.fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };

        if let Some(participant_ids) = data.participant_ids {
            replace_participants(&mut tx, meeting.id, meeting.created_by, &participant_ids).await?;
        }

        tx.commit().await?;

        Ok(Some(meeting))
    }

    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: MeetingStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meeting>(&format!(
            "UPDATE meetings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {MEETING_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_participant(
        pool: &PgPool,
        meeting_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM meeting_participants WHERE meeting_id = $1 AND user_id = $2)",
        )
        .bind(meeting_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Participants of many meetings with a single query
    pub async fn participants_for(
        pool: &PgPool,
        meeting_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<UserSummary>>, sqlx::Error> {
        let rows: Vec<(Uuid, Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT mp.meeting_id, u.id, u.name, u.email
            FROM meeting_participants mp
            INNER JOIN users u ON u.id = mp.user_id
            WHERE mp.meeting_id = ANY($1)
            ORDER BY u.name
            "#,
        )
        .bind(meeting_ids)
        .fetch_all(pool)
        .await?;

        let mut map: HashMap<Uuid, Vec<UserSummary>> =
            meeting_ids.iter().map(|id| (*id, Vec::new())).collect();
        for (meeting_id, id, name, email) in rows {
            map.entry(meeting_id).or_default().push(UserSummary { id, name, email });
        }

        Ok(map)
    }

    /// Counters over the meetings a user participates in
    ///
    /// Each counter is evaluated independently over the same set.
    pub async fn statistics_for(
        pool: &PgPool,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<MeetingStatistics, sqlx::Error> {
        let windows = CalendarWindows::around(now);

        sqlx::query_as::<_, MeetingStatistics>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE m.start_time >= $2 AND m.start_time < $3) AS today,
                   COUNT(*) FILTER (WHERE m.start_time >= $4 AND m.start_time < $5) AS this_week,
                   COUNT(*) FILTER (WHERE m.start_time >= $6 AND m.start_time < $7) AS this_month,
                   COUNT(*) FILTER (WHERE m.start_time > $8 AND m.status = 'scheduled') AS upcoming,
                   COUNT(*) FILTER (WHERE m.status = 'completed') AS completed
            FROM meetings m
            INNER JOIN meeting_participants mp ON mp.meeting_id = m.id
            WHERE mp.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(windows.day.0)
        .bind(windows.day.1)
        .bind(windows.week.0)
        .bind(windows.week.1)
        .bind(windows.month.0)
        .bind(windows.month.1)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub fn is_today(&self, now: DateTime<Utc>) -> bool {
        self.start_time.date_naive() == now.date_naive()
    }

    /// Inside its time range and marked in progress
    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time && self.status == MeetingStatus::InProgress
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now && self.status == MeetingStatus::Scheduled
    }

    /// Length as `H:MM`
    pub fn duration_label(&self) -> String {
        let minutes = (self.end_time - self.start_time).num_minutes().max(0);
        format!("{}:{:02}", minutes / 60, minutes % 60)
    }

    /// Time range as `HH:MM - HH:MM`
    pub fn formatted_time(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meeting(start: DateTime<Utc>, minutes: i64, status: MeetingStatus) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            title: "Standup".to_string(),
            description: None,
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            location: None,
            meeting_type: MeetingType::default(),
            status,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(MeetingType::default(), MeetingType::Offline);
        assert_eq!(MeetingStatus::default(), MeetingStatus::Scheduled);
    }

    #[test]
    fn test_derived_labels() {
        let start = Utc.with_ymd_and_hms(2025, 5, 6, 9, 5, 0).unwrap();
        let m = meeting(start, 95, MeetingStatus::Scheduled);
        assert_eq!(m.duration_label(), "1:35");
        assert_eq!(m.formatted_time(), "09:05 - 10:40");
    }

    #[test]
    fn test_time_flags() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 10, 0, 0).unwrap();

        let running = meeting(now - Duration::minutes(30), 60, MeetingStatus::InProgress);
        assert!(running.is_ongoing(now));
        assert!(running.is_today(now));
        assert!(!running.is_upcoming(now));

        let not_started = meeting(now - Duration::minutes(30), 60, MeetingStatus::Scheduled);
        assert!(!not_started.is_ongoing(now));

        let later = meeting(now + Duration::days(2), 30, MeetingStatus::Scheduled);
        assert!(later.is_upcoming(now));
        assert!(!later.is_today(now));

        let cancelled = meeting(now + Duration::days(2), 30, MeetingStatus::Cancelled);
        assert!(!cancelled.is_upcoming(now));
    }

    #[test]
    fn test_calendar_windows() {
        // Wednesday
        let now = Utc.with_ymd_and_hms(2025, 12, 17, 15, 30, 0).unwrap();
        let windows = CalendarWindows::around(now);

        assert_eq!(windows.day.0, Utc.with_ymd_and_hms(2025, 12, 17, 0, 0, 0).unwrap());
        assert_eq!(windows.day.1, Utc.with_ymd_and_hms(2025, 12, 18, 0, 0, 0).unwrap());
        assert_eq!(windows.week.0, Utc.with_ymd_and_hms(2025, 12, 15, 0, 0, 0).unwrap());
        assert_eq!(windows.week.1, Utc.with_ymd_and_hms(2025, 12, 22, 0, 0, 0).unwrap());
        assert_eq!(windows.month.0, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(windows.month.1, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_type_serializes_under_type_key() {
        let now = Utc::now();
        let json = serde_json::to_value(meeting(now, 30, MeetingStatus::InProgress)).unwrap();
        assert_eq!(json["type"], "offline");
        assert_eq!(json["status"], "in_progress");
    }
}
