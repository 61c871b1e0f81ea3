//! User-initiated mutations: proxying control actions to an agent and the
//! per-host description note.
//!
//! The action endpoint always answers with the `{success, message}` envelope
//! the dashboard expects, whatever went wrong underneath.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::ports::{AgentAction, AgentCommander, ControlError};
use crate::outbound::persistence::Store;

use super::error::{ApiError, ApiResult, run_blocking};

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub host_id: String,
    pub service: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

fn envelope(status: actix_web::http::StatusCode, success: bool, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ActionResponse { success, message })
}

pub async fn perform_action(
    store: web::Data<Store>,
    commander: web::Data<dyn AgentCommander>,
    body: web::Json<ActionRequest>,
) -> HttpResponse {
    use actix_web::http::StatusCode;

    let ActionRequest {
        host_id,
        service,
        action,
    } = body.into_inner();

    let action = match AgentAction::parse(&action) {
        Ok(action) => action,
        Err(err) => return envelope(StatusCode::BAD_REQUEST, false, err.to_string()),
    };

    let store = store.get_ref().clone();
    let lookup_id = host_id.clone();
    let target = match web::block(move || store.control_target(&lookup_id)).await {
        Ok(Ok(Some(target))) => target,
        Ok(Ok(None)) => {
            return envelope(
                StatusCode::NOT_FOUND,
                false,
                format!("no control interface known for host {host_id}"),
            );
        }
        Ok(Err(err)) => {
            warn!(host_id = %host_id, error = %err, "control target lookup failed");
            return envelope(StatusCode::INTERNAL_SERVER_ERROR, false, "storage failure".into());
        }
        Err(err) => {
            warn!(host_id = %host_id, error = %err, "control target lookup task failed");
            return envelope(StatusCode::INTERNAL_SERVER_ERROR, false, "storage failure".into());
        }
    };

    match commander.perform(&target, &service, action).await {
        Ok(()) => {
            info!(host_id = %host_id, service = %service, action = action.as_str(), "agent action scheduled");
            envelope(
                StatusCode::OK,
                true,
                format!("{} scheduled for {service}", action.as_str()),
            )
        }
        Err(err @ ControlError::UnsupportedAction { .. }) => {
            envelope(StatusCode::BAD_REQUEST, false, err.to_string())
        }
        Err(err) => {
            warn!(host_id = %host_id, service = %service, error = %err, "agent action failed");
            envelope(StatusCode::INTERNAL_SERVER_ERROR, false, err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub host_id: String,
    pub description: String,
}

pub async fn set_description(
    store: web::Data<Store>,
    body: web::Json<DescriptionRequest>,
) -> ApiResult<web::Json<ActionResponse>> {
    let DescriptionRequest {
        host_id,
        description,
    } = body.into_inner();
    let store = store.get_ref().clone();

    let updated = run_blocking(move || store.set_host_description(&host_id, &description)).await?;
    if !updated {
        return Err(ApiError::NotFound("host"));
    }
    Ok(web::Json(ActionResponse {
        success: true,
        message: "description updated".to_owned(),
    }))
}
