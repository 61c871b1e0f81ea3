//! Per-host event listing for the internal surface.

use actix_web::web;
use serde::Serialize;

use crate::domain::events;
use crate::outbound::persistence::{EventRow, MAX_EVENT_ROWS, Store};

use super::error::{ApiError, ApiResult, run_blocking};
use super::iso8601;

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub host_id: String,
    pub events: Vec<EventDto>,
}

#[derive(Debug, Serialize)]
pub struct EventDto {
    pub id: i64,
    pub service: String,
    #[serde(rename = "type")]
    pub event_type: i64,
    pub type_name: &'static str,
    pub message: String,
    pub created_at: String,
}

pub(crate) fn event_dto(row: EventRow) -> EventDto {
    EventDto {
        id: row.id,
        service: row.service_name,
        event_type: row.event_type,
        type_name: events::kind_name(row.event_type),
        message: row.message,
        created_at: iso8601(row.created_at),
    }
}

/// Most recent first, capped at 100 rows.
pub async fn host_events(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> ApiResult<web::Json<EventsResponse>> {
    let host_id = path.into_inner();
    let store = store.get_ref().clone();
    let id_for_query = host_id.clone();

    let rows = run_blocking(move || {
        if store.hostname(&id_for_query)?.is_none() {
            return Ok(None);
        }
        store
            .events_for_host(&id_for_query, MAX_EVENT_ROWS, 0)
            .map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("host"))?;

    Ok(web::Json(EventsResponse {
        host_id,
        events: rows.into_iter().map(event_dto).collect(),
    }))
}
