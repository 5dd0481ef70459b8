use actix_web::{get, post, web, HttpRequest, HttpResponse};

use crate::auth::identity;
use crate::error::Result;
use crate::models::role::Capability;
use crate::state::AppState;

#[get("/content")]
pub async fn get_contents(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    identity(&req)?.require(Capability::ViewContent)?;

    let contents = state.tribe.fetch_contents().await?;
    Ok(HttpResponse::Ok().json(contents))
}
#[post("/content/{content_id}/views")]
pub async fn record_view(
    state: web::Data<AppState>,
    content_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.require(Capability::ViewContent)?;

    state
        .tribe
        .record_view(&content_id, &user.id()?.to_hex())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
