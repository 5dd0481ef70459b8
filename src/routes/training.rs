use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::auth::identity;
use crate::database::parse_id;
use crate::error::{AppError, Result};
use crate::events::ProgressEvent;
use crate::models::{
    role::Capability,
    training::{Training, TrainingRequest, TrainingResponse},
    training_progress::TrainingProgress,
    worksheet::{Worksheet, WorksheetRequest},
};
use crate::state::AppState;

async fn find_training(state: &AppState, training_id: &str) -> Result<Training> {
    let training_id = parse_id(training_id)?;
    Training::find_by_id(&state.db, &training_id)
        .await?
        .ok_or_else(|| AppError::not_found("TRAINING_NOT_FOUND"))
}

#[get("/trainings")]
pub async fn get_trainings(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    identity(&req)?.require(Capability::ViewContent)?;

    let trainings = Training::find_many(&state.db).await?;
    let trainings: Vec<TrainingResponse> = trainings.iter().map(TrainingResponse::from).collect();
    Ok(HttpResponse::Ok().json(trainings))
}
#[post("/trainings")]
pub async fn create_training(
    state: web::Data<AppState>,
    payload: web::Json<TrainingRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    identity(&req)?.require(Capability::ManageTrainings)?;

    let mut training = Training::from_request(payload.into_inner(), Utc::now())?;
    let _id = training.save(&state.db).await?;
    tracing::info!(training_id = %_id, title = %training.title, "training created");
    Ok(HttpResponse::Created().body(_id.to_string()))
}
#[post("/trainings/reorder")]
pub async fn reorder_trainings(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    identity(&req)?.require(Capability::ManageTrainings)?;

    let count = Training::reorder_by_date(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "reordered": count })))
}
#[put("/trainings/{training_id}")]
pub async fn update_training(
    state: web::Data<AppState>,
    training_id: web::Path<String>,
    payload: web::Json<TrainingRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    identity(&req)?.require(Capability::ManageTrainings)?;

    let existing = find_training(&state, &training_id).await?;
    let mut training = Training::from_request(payload.into_inner(), Utc::now())?;
    training._id = existing._id;
    training.order = existing.order;
    training.created_at = existing.created_at;

    let _id = training.update(&state.db).await?;
    Ok(HttpResponse::Ok().body(_id.to_string()))
}
#[post("/trainings/{training_id}/video")]
pub async fn complete_video(
    state: web::Data<AppState>,
    training_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.require(Capability::CompleteTraining)?;
    let user_id = user.id()?;
    let training = find_training(&state, &training_id).await?;
    let training_id = training
        ._id
        .ok_or_else(|| AppError::not_found("TRAINING_NOT_FOUND"))?;

    TrainingProgress::mark_video_completed(&state.db, &user_id, &training_id, Utc::now()).await?;
    state.events.publish(ProgressEvent::VideoCompleted {
        user_id: user_id.to_hex(),
        training_id: training_id.to_hex(),
    });
    Ok(HttpResponse::Ok().body(training_id.to_string()))
}
#[post("/trainings/{training_id}/worksheets")]
pub async fn submit_worksheet(
    state: web::Data<AppState>,
    training_id: web::Path<String>,
    payload: web::Json<WorksheetRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.require(Capability::SubmitWorksheet)?;
    let user_id = user.id()?;
    let training = find_training(&state, &training_id).await?;
    let training_id = training
        ._id
        .ok_or_else(|| AppError::not_found("TRAINING_NOT_FOUND"))?;

    let submission =
        Worksheet::submit(&state.db, user_id, training_id, payload.into_inner(), Utc::now()).await?;
    state.events.publish(ProgressEvent::WorksheetSubmitted {
        user_id: user_id.to_hex(),
        training_id: training_id.to_hex(),
        bold_action_id: submission.bold_action_id.clone(),
    });
    Ok(HttpResponse::Created().json(submission))
}
