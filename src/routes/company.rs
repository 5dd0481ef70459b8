use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::auth::identity;
use crate::database::parse_id;
use crate::error::{AppError, Result};
use crate::models::{
    company::{Company, CompanyJoinRequest, CompanyRequest, CompanyResponse},
    invite::{InviteLink, InviteRequest, InviteResponse},
    role::{belongs_to, Capability},
    user::{User, UserResponse, UserRole},
};
use crate::state::AppState;

/// The caller's profile, as long as it is not attached to a company yet.
fn unaffiliated_user(req: &HttpRequest) -> Result<User> {
    let identity = identity(req)?;
    let user = identity.user()?;
    if user.company_id.is_some() {
        return Err(AppError::conflict("USER_ALREADY_IN_COMPANY"));
    }
    Ok(user.clone())
}

/// Fails unless `supervisor_id` is a supervisor of `company_id`.
async fn check_supervisor(
    state: &AppState,
    company_id: &ObjectId,
    supervisor_id: &ObjectId,
) -> Result<()> {
    match User::find_by_id(&state.db, supervisor_id).await? {
        Some(supervisor)
            if supervisor.role == UserRole::Supervisor && belongs_to(&supervisor, company_id) =>
        {
            Ok(())
        }
        _ => Err(AppError::not_found("SUPERVISOR_NOT_FOUND")),
    }
}

/// Creates a company; its creator becomes the first executive.
#[post("/companies")]
pub async fn create_company(
    state: web::Data<AppState>,
    payload: web::Json<CompanyRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let mut user = unaffiliated_user(&req)?;

    let mut company = Company::from_request(payload.into_inner(), user.id()?, Utc::now())?;
    let company_id = company.save(&state.db).await?;
    user.join_company(&state.db, company_id, UserRole::Executive, None)
        .await?;
    tracing::info!(company_id = %company_id, name = %company.name, "company created");
    Ok(HttpResponse::Created().body(company_id.to_string()))
}
#[get("/companies/{company_id}")]
pub async fn get_company(
    state: web::Data<AppState>,
    company_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let user = identity.user()?;
    let company_id = parse_id(&company_id)?;
    if !belongs_to(user, &company_id) {
        return Err(AppError::PermissionDenied);
    }

    match Company::find_by_id(&state.db, &company_id).await? {
        Some(company) => Ok(HttpResponse::Ok().json(CompanyResponse::from(&company))),
        None => Err(AppError::not_found("COMPANY_NOT_FOUND")),
    }
}
#[post("/companies/{company_id}/invites")]
pub async fn create_invite(
    state: web::Data<AppState>,
    company_id: web::Path<String>,
    payload: web::Json<InviteRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = identity(&req)?;
    let issuer = identity.require(Capability::InviteTeamMembers)?;
    let company_id = parse_id(&company_id)?;
    if !belongs_to(issuer, &company_id) {
        return Err(AppError::PermissionDenied);
    }

    let mut invite = InviteLink::new(
        payload.into_inner(),
        issuer,
        company_id,
        state.settings.invite_ttl_days,
        Utc::now(),
    )?;
    if let (UserRole::Executive, Some(supervisor_id)) = (issuer.role, invite.supervisor_id) {
        check_supervisor(&state, &company_id, &supervisor_id).await?;
    }
    invite.save(&state.db).await?;
    tracing::info!(company_id = %company_id, role = ?invite.role, "invite link created");
    Ok(HttpResponse::Created().json(InviteResponse::from(&invite)))
}
#[post("/invites/{code}/join")]
pub async fn join_by_invite(
    state: web::Data<AppState>,
    code: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let mut user = unaffiliated_user(&req)?;
    let now = Utc::now();

    let mut invite = InviteLink::find_by_code(&state.db, &code)
        .await?
        .ok_or_else(|| AppError::not_found("INVITE_NOT_FOUND"))?;
    invite.check_usable(&user.email, now)?;
    invite.mark_used(&state.db, now).await?;

    user.join_company(&state.db, invite.company_id, invite.role, invite.supervisor_id)
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
#[post("/companies/{company_id}/join")]
pub async fn join_by_password(
    state: web::Data<AppState>,
    company_id: web::Path<String>,
    payload: web::Json<CompanyJoinRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let mut user = unaffiliated_user(&req)?;
    let company_id = parse_id(&company_id)?;
    let payload = payload.into_inner();

    let company = Company::find_by_id(&state.db, &company_id)
        .await?
        .ok_or_else(|| AppError::not_found("COMPANY_NOT_FOUND"))?;
    let role = company
        .role_for_password(&payload.password)
        .ok_or(AppError::PermissionDenied)?;
    let supervisor_id = match (role, payload.supervisor_id.as_deref()) {
        (UserRole::TeamMember, Some(raw_id)) => {
            let supervisor_id = parse_id(raw_id)?;
            check_supervisor(&state, &company_id, &supervisor_id).await?;
            Some(supervisor_id)
        }
        _ => None,
    };

    user.join_company(&state.db, company_id, role, supervisor_id)
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
