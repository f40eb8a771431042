//! Slot endpoints.
//!
//! - `POST /slots/open` (MENTOR)
//! - `DELETE /slots/close/:slot_id` (MENTOR, owner)
//! - `GET /slots/my-slots` (MENTOR)
//! - `GET /slots/mentor/:mentor_id` (public)

use super::{ok, parse_id, ApiResponse};
use crate::error::AppError;
use crate::extractors::{ApiJson, Identity};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mentorship_core::slots::parse_date;
use mentorship_core::{MentorSlots, Role, Slot, SlotFilter, SlotId, SlotStatus, SlotTime, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Body of `POST /slots/open`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSlotRequest {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM`, on the hour or half hour
    pub start_time: Option<String>,
}

/// Query string of the slot listings. All filters optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    /// `AVAILABLE`, `BOOKED` or `CLOSED` (own listing only)
    pub status: Option<String>,
    /// Exact day
    pub date: Option<String>,
    /// First day, inclusive
    pub start_date: Option<String>,
    /// Last day, inclusive
    pub end_date: Option<String>,
}

/// One slot.
#[derive(Debug, Serialize)]
pub struct SlotBody {
    /// The slot
    pub slot: Slot,
}

/// A slot listing.
#[derive(Debug, Serialize)]
pub struct SlotsBody {
    /// Matching slots, by date and start time
    pub slots: Vec<Slot>,
}

/// Acknowledgement without payload.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    /// What happened
    pub message: &'static str,
}

/// Parse an optional field, recording a `(field, message)` entry on failure.
fn field<T, E: Display>(
    invalid: &mut Vec<(&'static str, String)>,
    name: &'static str,
    raw: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Option<T> {
    match raw.map(parse) {
        Some(Ok(value)) => Some(value),
        Some(Err(e)) => {
            invalid.push((name, e.to_string()));
            None
        }
        None => None,
    }
}

impl SlotQuery {
    fn into_filter(self) -> Result<SlotFilter, AppError> {
        let mut invalid = Vec::new();
        let filter = SlotFilter {
            status: field(&mut invalid, "status", self.status.as_deref(), str::parse::<SlotStatus>),
            date: field(&mut invalid, "date", self.date.as_deref(), parse_date),
            start_date: field(&mut invalid, "startDate", self.start_date.as_deref(), parse_date),
            end_date: field(&mut invalid, "endDate", self.end_date.as_deref(), parse_date),
        };
        if invalid.is_empty() {
            Ok(filter)
        } else {
            Err(AppError::validation(&invalid))
        }
    }
}

/// Open a slot for the calling mentor.
///
/// ```bash
/// curl -X POST http://localhost:8080/slots/open \
///   -H "X-User-Id: <mentor uuid>" -H "X-User-Role: MENTOR" \
///   -H "Content-Type: application/json" \
///   -d '{"date": "2025-03-14", "startTime": "14:00"}'
/// ```
pub async fn open_slot(
    identity: Identity,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OpenSlotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SlotBody>>), AppError> {
    let mentor_id = identity.require(Role::Mentor)?;

    let mut invalid = Vec::new();
    let date = field(&mut invalid, "date", request.date.as_deref(), parse_date);
    let start_time = field(
        &mut invalid,
        "startTime",
        request.start_time.as_deref(),
        SlotTime::parse,
    );
    if request.date.is_none() {
        invalid.push(("date", "date is required".to_string()));
    }
    if request.start_time.is_none() {
        invalid.push(("startTime", "startTime is required".to_string()));
    }
    let (Some(date), Some(start_time)) = (date, start_time) else {
        return Err(AppError::validation(&invalid));
    };

    let slot = state.slots.open(mentor_id, date, start_time).await?;
    Ok((StatusCode::CREATED, ok(SlotBody { slot })))
}

/// Close (delete) one of the calling mentor's AVAILABLE slots.
pub async fn close_slot(
    identity: Identity,
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
) -> Result<Json<ApiResponse<MessageBody>>, AppError> {
    let mentor_id = identity.require(Role::Mentor)?;
    let slot_id: SlotId = parse_id(&slot_id, "slot")?;

    state.slots.close(mentor_id, slot_id).await?;
    Ok(ok(MessageBody {
        message: "Slot closed",
    }))
}

/// The calling mentor's slots with per-status counts.
pub async fn my_slots(
    identity: Identity,
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<ApiResponse<MentorSlots>>, AppError> {
    let mentor_id = identity.require(Role::Mentor)?;
    let filter = query.into_filter()?;

    Ok(ok(state.slots.list_for_mentor(mentor_id, filter).await?))
}

/// A verified mentor's future AVAILABLE slots.
pub async fn mentor_slots(
    State(state): State<AppState>,
    Path(mentor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<ApiResponse<SlotsBody>>, AppError> {
    let mentor_id: UserId = parse_id(&mentor_id, "mentor")?;
    let filter = query.into_filter()?;

    let slots = state
        .slots
        .list_available_for_mentor(mentor_id, filter)
        .await?;
    Ok(ok(SlotsBody { slots }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_every_filter() {
        let query = SlotQuery {
            status: Some("BOOKED".into()),
            date: None,
            start_date: Some("2025-01-02".into()),
            end_date: Some("2025-01-09".into()),
        };

        let filter = query.into_filter().unwrap_or_default();

        assert_eq!(filter.status, Some(SlotStatus::Booked));
        assert_eq!(filter.start_date, parse_date("2025-01-02").ok());
        assert_eq!(filter.end_date, parse_date("2025-01-09").ok());
    }

    #[test]
    fn test_query_reports_each_bad_field() {
        let query = SlotQuery {
            status: Some("OPEN".into()),
            date: Some("14/03/2025".into()),
            ..SlotQuery::default()
        };

        let err = query.into_filter().err();

        assert_eq!(err.map(|e| e.code()), Some("VALIDATION_ERROR"));
    }
}
