use actix_web::{get, put, web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::auth::identity;
use crate::database::parse_id;
use crate::error::{AppError, Result};
use crate::events::ProgressEvent;
use crate::models::{
    bold_action::{BoldAction, BoldActionCompletion, BoldActionResponse},
    role::Capability,
};
use crate::state::AppState;

#[get("/bold-actions")]
pub async fn get_bold_actions(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.require(Capability::ViewOwnProgress)?;

    let actions = BoldAction::find_by_user(&state.db, &user.id()?).await?;
    let actions: Vec<BoldActionResponse> = actions.iter().map(BoldActionResponse::from).collect();
    Ok(HttpResponse::Ok().json(actions))
}
#[put("/bold-actions/{bold_action_id}/complete")]
pub async fn complete_bold_action(
    state: web::Data<AppState>,
    bold_action_id: web::Path<String>,
    payload: web::Json<BoldActionCompletion>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.require(Capability::CompleteBoldAction)?;
    let bold_action_id = parse_id(&bold_action_id)?;

    let mut action = BoldAction::find_by_id(&state.db, &bold_action_id)
        .await?
        .ok_or_else(|| AppError::not_found("BOLD_ACTION_NOT_FOUND"))?;
    if Some(action.user_id) != user._id {
        return Err(AppError::PermissionDenied);
    }

    action.complete(payload.into_inner(), Utc::now())?;
    let _id = action.save_completion(&state.db).await?;
    tracing::info!(bold_action_id = %_id, user_id = %action.user_id, "bold action completed");
    state.events.publish(ProgressEvent::BoldActionCompleted {
        user_id: action.user_id.to_hex(),
        bold_action_id: _id.to_hex(),
    });
    Ok(HttpResponse::Ok().body(_id.to_string()))
}
