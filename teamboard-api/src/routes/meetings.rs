/// Meeting endpoints
///
/// Meetings are visible to their participants, their creator and admins.
/// Only the creator or an admin may change or delete one. The creator is
/// always a participant.

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use teamboard_shared::{
    auth::{authorization::require_author_or_admin, middleware::AuthContext},
    models::{
        meeting::{CreateMeeting, Meeting, MeetingStatus, MeetingType, UpdateMeeting},
        user::{User, UserSummary},
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, AppJson, AppPath},
    response::ApiResponse,
};

/// A meeting with its participants and display helpers
#[derive(Debug, Clone, Serialize)]
pub struct MeetingResource {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub participants: Vec<UserSummary>,
    pub participant_ids: Vec<Uuid>,
    pub is_today: bool,
    pub is_ongoing: bool,
    pub is_upcoming: bool,
    /// `H:MM`
    pub duration: String,
    /// `HH:MM - HH:MM`
    pub formatted_time: String,
}

impl MeetingResource {
    pub fn new(meeting: Meeting, participants: Vec<UserSummary>, now: DateTime<Utc>) -> Self {
        Self {
            participant_ids: participants.iter().map(|p| p.id).collect(),
            is_today: meeting.is_today(now),
            is_ongoing: meeting.is_ongoing(now),
            is_upcoming: meeting.is_upcoming(now),
            duration: meeting.duration_label(),
            formatted_time: meeting.formatted_time(),
            participants,
            meeting,
        }
    }

    pub fn from_meetings(
        meetings: Vec<Meeting>,
        mut participants: HashMap<Uuid, Vec<UserSummary>>,
        now: DateTime<Utc>,
    ) -> Vec<Self> {
        meetings
            .into_iter()
            .map(|meeting| {
                let users = participants.remove(&meeting.id).unwrap_or_default();
                Self::new(meeting, users, now)
            })
            .collect()
    }
}

pub(crate) async fn render_meetings(state: &AppState, meetings: Vec<Meeting>) -> ApiResult<Vec<MeetingResource>> {
    let ids: Vec<Uuid> = meetings.iter().map(|m| m.id).collect();
    let participants = Meeting::participants_for(&state.db, &ids).await?;

    Ok(MeetingResource::from_meetings(meetings, participants, Utc::now()))
}

async fn render_meeting(state: &AppState, meeting: Meeting) -> ApiResult<MeetingResource> {
    let mut rendered = render_meetings(state, vec![meeting]).await?;
    rendered
        .pop()
        .ok_or_else(|| ApiError::InternalError("Meeting vanished while rendering".to_string()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMeetingRequest {
    #[validate(length(min = 1, max = 255, message = "The title must be between 1 and 255 characters."))]
    pub title: String,

    pub description: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(length(max = 255, message = "The location may not be greater than 255 characters."))]
    pub location: Option<String>,

    #[serde(rename = "type")]
    pub meeting_type: Option<MeetingType>,

    pub status: Option<MeetingStatus>,

    pub participant_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeetingRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,

    #[serde(rename = "type")]
    pub meeting_type: Option<MeetingType>,

    pub status: Option<MeetingStatus>,

    pub participant_ids: Option<Vec<Uuid>>,
}

fn check_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> ApiResult<()> {
    if end <= start {
        return Err(ApiError::invalid("end_time", "The end time must be a date after start time."));
    }
    Ok(())
}

async fn check_participants(state: &AppState, ids: &[Uuid]) -> ApiResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let existing = User::existing_ids(&state.db, ids).await?;
    if ids.iter().any(|id| !existing.contains(id)) {
        return Err(ApiError::invalid(
            "participant_ids",
            "One or more selected participants do not exist.",
        ));
    }
    Ok(())
}

async fn load_meeting(state: &AppState, id: Uuid) -> ApiResult<Meeting> {
    Meeting::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meeting"))
}

/// Meetings the requester takes part in, soonest first
pub async fn index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<MeetingResource>>> {
    let meetings = Meeting::list_for_participant(&state.db, auth.user_id).await?;

    Ok(ApiResponse::success(render_meetings(&state, meetings).await?))
}

pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateMeetingRequest>,
) -> ApiResult<ApiResponse<MeetingResource>> {
    req.validate()?;
    check_time_range(req.start_time, req.end_time)?;

    let participant_ids = req.participant_ids.unwrap_or_default();
    check_participants(&state, &participant_ids).await?;

    let meeting = Meeting::create(
        &state.db,
        CreateMeeting {
            title: req.title.trim().to_string(),
            description: req.description,
            start_time: req.start_time,
            end_time: req.end_time,
            location: req.location,
            meeting_type: req.meeting_type.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            created_by: auth.user_id,
            participant_ids,
        },
    )
    .await?;

    tracing::info!(meeting_id = %meeting.id, created_by = %auth.user_id, "Meeting scheduled");

    Ok(ApiResponse::created(render_meeting(&state, meeting).await?).with_message("Meeting created successfully"))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<MeetingResource>> {
    let meeting = load_meeting(&state, id).await?;

    let allowed = auth.is_admin()
        || meeting.created_by == auth.user_id
        || Meeting::is_participant(&state.db, meeting.id, auth.user_id).await?;
    if !allowed {
        return Err(ApiError::Forbidden("You are not a participant of this meeting".to_string()));
    }

    Ok(ApiResponse::success(render_meeting(&state, meeting).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateMeetingRequest>,
) -> ApiResult<ApiResponse<MeetingResource>> {
    let meeting = load_meeting(&state, id).await?;
    require_author_or_admin(&auth, meeting.created_by)?;

    if let Some(title) = &req.title {
        let length = title.trim().chars().count();
        if length == 0 || length > 255 {
            return Err(ApiError::invalid("title", "The title must be between 1 and 255 characters."));
        }
    }
    check_time_range(
        req.start_time.unwrap_or(meeting.start_time),
        req.end_time.unwrap_or(meeting.end_time),
    )?;
    if let Some(ids) = &req.participant_ids {
        check_participants(&state, ids).await?;
    }

    let meeting = Meeting::update(
        &state.db,
        meeting.id,
        UpdateMeeting {
            title: req.title.map(|title| title.trim().to_string()),
            description: req.description,
            start_time: req.start_time,
            end_time: req.end_time,
            location: req.location,
            meeting_type: req.meeting_type,
            status: req.status,
            participant_ids: req.participant_ids,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Meeting"))?;

    Ok(ApiResponse::success(render_meeting(&state, meeting).await?).with_message("Meeting updated successfully"))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let meeting = load_meeting(&state, id).await?;
    require_author_or_admin(&auth, meeting.created_by)?;

    Meeting::delete(&state.db, meeting.id).await?;

    Ok(ApiResponse::message("Meeting deleted successfully"))
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
            end_time: start + chrono::Duration::minutes(minutes),
            location: None,
            meeting_type: MeetingType::Online,
            status,
            created_by: Uuid::new_v4(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_resource_derived_fields() {
        let start = Utc.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 8, 0, 0).unwrap();
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };

        let resource = MeetingResource::new(meeting(start, 90, MeetingStatus::Scheduled), vec![user.clone()], now);

        assert!(resource.is_today);
        assert!(resource.is_upcoming);
        assert!(!resource.is_ongoing);
        assert_eq!(resource.duration, "1:30");
        assert_eq!(resource.formatted_time, "09:00 - 10:30");
        assert_eq!(resource.participant_ids, vec![user.id]);

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "online");
        assert_eq!(json["status"], "scheduled");
    }

    #[test]
    fn test_time_range() {
        let start = Utc.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap();
        assert!(check_time_range(start, start + chrono::Duration::minutes(1)).is_ok());
        assert!(check_time_range(start, start).is_err());
    }

    #[test]
    fn test_meeting_type_is_read_from_type_key() {
        let req: UpdateMeetingRequest = serde_json::from_str(r#"{"type": "hybrid"}"#).unwrap();
        assert_eq!(req.meeting_type, Some(MeetingType::Hybrid));
    }
}
