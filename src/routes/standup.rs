use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::auth::identity;
use crate::database::parse_id;
use crate::error::{AppError, Result};
use crate::events::ProgressEvent;
use crate::models::{
    role::{can_view_member, Capability},
    standup::{Standup, StandupCompletion, StandupRequest, StandupResponse},
    user::{User, UserRole},
};
use crate::state::AppState;

#[get("/standups")]
pub async fn get_standups(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.require(Capability::ViewOwnProgress)?;

    let standups = Standup::find_for_user(&state.db, &user.id()?).await?;
    let standups: Vec<StandupResponse> = standups.iter().map(StandupResponse::from).collect();
    Ok(HttpResponse::Ok().json(standups))
}
#[post("/standups")]
pub async fn create_standup(
    state: web::Data<AppState>,
    payload: web::Json<StandupRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let issuer = identity.require(Capability::ManageStandups)?;
    let payload = payload.into_inner();

    let member_id = parse_id(&payload.team_member_id)?;
    let member = User::find_by_id(&state.db, &member_id)
        .await?
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND"))?;
    if member.role != UserRole::TeamMember || !can_view_member(issuer, &member) {
        return Err(AppError::PermissionDenied);
    }
    let supervisor_id = match issuer.role {
        UserRole::Supervisor => issuer.id()?,
        _ => member
            .supervisor_id
            .ok_or_else(|| AppError::validation("USER_MUST_HAVE_SUPERVISOR"))?,
    };

    let mut standup = Standup::schedule(
        supervisor_id,
        member_id,
        payload.scheduled_at,
        &payload.meeting_link,
        Utc::now(),
    )?;
    let _id = standup.save(&state.db).await?;
    state.events.publish(ProgressEvent::StandupScheduled {
        standup_id: _id.to_hex(),
        supervisor_id: supervisor_id.to_hex(),
        team_member_id: member_id.to_hex(),
    });
    Ok(HttpResponse::Created().body(_id.to_string()))
}
#[put("/standups/{standup_id}/complete")]
pub async fn complete_standup(
    state: web::Data<AppState>,
    standup_id: web::Path<String>,
    payload: web::Json<StandupCompletion>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let issuer = identity.require(Capability::ManageStandups)?;
    let standup_id = parse_id(&standup_id)?;

    let mut standup = Standup::find_by_id(&state.db, &standup_id)
        .await?
        .ok_or_else(|| AppError::not_found("STANDUP_NOT_FOUND"))?;
    if Some(standup.supervisor_id) != issuer._id {
        return Err(AppError::PermissionDenied);
    }

    standup.complete(payload.into_inner(), Utc::now())?;
    let _id = standup.save_completion(&state.db).await?;
    state.events.publish(ProgressEvent::StandupCompleted {
        standup_id: _id.to_hex(),
        supervisor_id: standup.supervisor_id.to_hex(),
        team_member_id: standup.team_member_id.to_hex(),
    });
    Ok(HttpResponse::Ok().body(_id.to_string()))
}
