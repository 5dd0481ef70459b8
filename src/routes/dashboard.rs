use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::auth::identity;
use crate::database::parse_id;
use crate::error::{AppError, Result};
use crate::models::{
    role::{belongs_to, can_view_team, Capability},
    user::UserRole,
};
use crate::progress::reducer::{aggregate_company, aggregate_team, build_leaderboard};
use crate::state::AppState;

#[get("/teams/{supervisor_id}/metrics")]
pub async fn get_team_metrics(
    state: web::Data<AppState>,
    supervisor_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let viewer = identity.require(Capability::ViewTeamDashboard)?;
    let supervisor_id = parse_id(&supervisor_id)?;

    let supervisor = state
        .users
        .user(&supervisor_id)
        .await?
        .filter(|user| user.role == UserRole::Supervisor)
        .ok_or_else(|| AppError::not_found("SUPERVISOR_NOT_FOUND"))?;
    if !can_view_team(viewer, &supervisor) {
        return Err(AppError::PermissionDenied);
    }

    let members = state.users.team(&supervisor_id).await?;
    let metrics = aggregate_team(
        state.source.as_ref(),
        &supervisor,
        &members,
        Utc::now(),
        &state.settings.thresholds,
    )
    .await;
    Ok(HttpResponse::Ok().json(metrics))
}
#[get("/companies/{company_id}/dashboard")]
pub async fn get_company_dashboard(
    state: web::Data<AppState>,
    company_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let viewer = identity.require(Capability::ViewCompanyDashboard)?;
    let company_id = parse_id(&company_id)?;
    if !belongs_to(viewer, &company_id) {
        return Err(AppError::PermissionDenied);
    }

    let users = state.users.company_users(&company_id).await?;
    let metrics = aggregate_company(
        state.source.as_ref(),
        &users,
        Utc::now(),
        &state.settings.thresholds,
    )
    .await;
    tracing::debug!(
        company_id = %company_id,
        users = metrics.user_count,
        failed = metrics.failed_count,
        "company dashboard aggregated"
    );
    Ok(HttpResponse::Ok().json(metrics))
}
#[get("/companies/{company_id}/leaderboard")]
pub async fn get_leaderboard(
    state: web::Data<AppState>,
    company_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let viewer = identity.require(Capability::ViewLeaderboard)?;
    let company_id = parse_id(&company_id)?;
    if !belongs_to(viewer, &company_id) {
        return Err(AppError::PermissionDenied);
    }

    let users = state.users.company_users(&company_id).await?;
    let board = build_leaderboard(state.source.as_ref(), &users).await;
    Ok(HttpResponse::Ok().json(board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityMiddlewareFactory;
    use crate::progress::memory::{
        completed_bold_action, supervisor, team_member, user, video_progress, MemorySource,
    };
    use crate::routes::{
        configure,
        tests::{bearer, test_state},
    };
    use actix_web::{http::StatusCode, test, App};
    use mongodb::bson::oid::ObjectId;
    use serde_json::Value;

    struct Company {
        id: ObjectId,
        lead_id: ObjectId,
        source: MemorySource,
    }

    /// One executive, one supervisor and three members; Dee's reads fail.
    fn company() -> Company {
        let id = ObjectId::new();
        let eve = user("Eve", UserRole::Executive, id, None);
        let ada = supervisor("Ada", id);
        let ben = team_member("Ben", id, &ada);
        let cal = team_member("Cal", id, &ada);
        let dee = team_member("Dee", id, &ada);

        let now = Utc::now();
        let mut source = MemorySource::default();
        source.add_training_progress(video_progress(ben._id.unwrap(), now));
        source.add_training_progress(video_progress(cal._id.unwrap(), now));
        source.add_bold_action(completed_bold_action(ben._id.unwrap(), now));
        source.fail_for(dee._id.unwrap());

        let lead_id = ada._id.unwrap();
        for member in [eve, ada, ben, cal, dee] {
            source.add_user(member);
        }
        Company {
            id,
            lead_id,
            source,
        }
    }

    async fn fetch(company: Company, uri: &str, auth_uid: &str) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(test_state(company.source).await)
                .wrap(IdentityMiddlewareFactory)
                .configure(configure),
        )
        .await;
        let request = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(auth_uid))
            .to_request();
        let response = test::call_service(&app, request).await;
        let status = response.status();
        let body = test::read_body(response).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[actix_web::test]
    async fn executive_dashboard_keeps_failed_members_in_the_count() {
        let company = company();
        let uri = format!("/companies/{}/dashboard", company.id);
        let (status, body) = fetch(company, &uri, "uid-Eve").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_count"], 3);
        assert_eq!(body["failed_count"], 1);
        assert_eq!(body["weekly"]["trainings"]["completed"], 2);
        assert_eq!(body["weekly"]["trainings"]["denominator"], 3);
        assert_eq!(body["weekly"]["trainings"]["percentage"], 66.7);
        assert_eq!(body["weekly"]["trainings"]["status"], "warning");
        assert_eq!(body["weekly"]["bold_actions"]["status"], "critical");

        let team = &body["teams"][0];
        assert_eq!(team["supervisor_name"], "Ada");
        assert_eq!(team["team_size"], 3);
        assert_eq!(team["members"].as_array().unwrap().len(), 3);
        assert_eq!(team["members"][2]["fetch_failed"], true);
        assert!(team["members"][0].get("supervisor_id").is_none());
    }

    #[actix_web::test]
    async fn supervisors_cannot_open_the_company_dashboard() {
        let company = company();
        let uri = format!("/companies/{}/dashboard", company.id);
        let (status, _) = fetch(company, &uri, "uid-Ada").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn supervisor_sees_their_team_metrics() {
        let company = company();
        let uri = format!("/teams/{}/metrics", company.lead_id);
        let (status, body) = fetch(company, &uri, "uid-Ada").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["supervisor_name"], "Ada");
        assert_eq!(body["team_size"], 3);
        assert_eq!(body["weekly"]["bold_actions"]["completed"], 1);
        assert_eq!(body["four_week"]["trainings"]["denominator"], 12);
        assert_eq!(body["members"][0]["name"], "Ben");
        assert_eq!(body["members"][0]["weekly"]["trainings"], 1);
    }

    #[actix_web::test]
    async fn team_members_cannot_open_team_metrics() {
        let company = company();
        let uri = format!("/teams/{}/metrics", company.lead_id);
        let (status, _) = fetch(company, &uri, "uid-Ben").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
