use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::UNIX_EPOCH;

use crate::auth::identity;
use crate::database::parse_id;
use crate::error::{AppError, Result};
use crate::models::{
    role::{can_view_member, capabilities, Capability},
    training_progress::TrainingProgressResponse,
    user::{User, UserRequest, UserResponse, UserRole},
};
use crate::progress::reducer::UserProgress;
use crate::state::AppState;

#[derive(Serialize)]
struct MeResponse {
    user: UserResponse,
    capabilities: BTreeSet<Capability>,
}
#[derive(Serialize)]
struct ProgressResponse {
    user: UserResponse,
    progress: UserProgress,
    trainings: Vec<TrainingProgressResponse>,
}

#[post("/users")]
pub async fn create_user(
    state: web::Data<AppState>,
    payload: web::Json<UserRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    if identity.user.is_some() {
        return Err(AppError::conflict("USER_ALREADY_EXIST"));
    }
    let email = identity
        .email
        .as_deref()
        .ok_or_else(|| AppError::validation("USER_MUST_HAVE_VALID_EMAIL"))?;

    let mut user = User::register(&identity.auth_uid, email, payload.into_inner())?;
    let _id = user.save(&state.db).await?;
    tracing::info!(user_id = %_id, "user registered");
    Ok(HttpResponse::Created().body(_id.to_string()))
}
#[get("/me")]
pub async fn get_me(req: HttpRequest) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.user()?;
    Ok(HttpResponse::Ok().json(MeResponse {
        user: UserResponse::from(user),
        capabilities: capabilities(user.role),
    }))
}
#[get("/users")]
pub async fn get_users(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let issuer = identity.require(Capability::ViewTeamDashboard)?;

    let users = match (issuer.role, issuer.company_id) {
        (UserRole::Executive, Some(company_id)) => {
            User::find_by_company(&state.db, &company_id).await?
        }
        (UserRole::Executive, None) => Vec::new(),
        _ => User::find_team(&state.db, &issuer.id()?).await?,
    };
    let users: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(users))
}
/// Counters are derived from the user's records on every call and written
/// back to the profile.
#[get("/users/{user_id}/progress")]
pub async fn get_user_progress(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let viewer = identity.require(Capability::ViewOwnProgress)?;
    let user_id = parse_id(&user_id)?;

    let mut user = User::find_by_id(&state.db, &user_id)
        .await?
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND"))?;
    if !can_view_member(viewer, &user) {
        return Err(AppError::PermissionDenied);
    }

    let since = DateTime::<Utc>::from(UNIX_EPOCH);
    let (bold_actions, training_progress) = futures::try_join!(
        state.source.bold_actions_since(&user_id, since),
        state.source.training_progress_since(&user_id, since),
    )?;
    let progress = UserProgress::from_records(
        &bold_actions,
        &training_progress,
        state.settings.total_activities,
    );
    user.refresh_counters(&state.db, &progress).await?;

    Ok(HttpResponse::Ok().json(ProgressResponse {
        user: UserResponse::from(&user),
        progress,
        trainings: training_progress
            .iter()
            .map(TrainingProgressResponse::from)
            .collect(),
    }))
}
