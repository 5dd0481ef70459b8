use chrono::{DateTime, Duration, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::user::{is_valid_email, User, UserRole};
use crate::database::{parse_id, INVITES};
use crate::error::{AppError, Result};

/// Single-use link that places its recipient in a company with a fixed role.
#[derive(Debug, Deserialize, Serialize)]
pub struct InviteLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub code: String,
    pub company_id: ObjectId,
    pub role: UserRole,
    pub email: String,
    pub supervisor_id: Option<ObjectId>,
    pub created_by: ObjectId,
    pub created_at: BsonDateTime,
    pub expires_at: BsonDateTime,
    pub used_at: Option<BsonDateTime>,
}
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub supervisor_id: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub code: String,
    pub role: UserRole,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl InviteLink {
    fn collection(db: &Database) -> Collection<InviteLink> {
        db.collection::<InviteLink>(INVITES)
    }

    /// Validates the request on behalf of `issuer`. Supervisors may only invite
    /// team members, who then report to them.
    pub fn new(
        request: InviteRequest,
        issuer: &User,
        company_id: ObjectId,
        ttl_days: i64,
        now: DateTime<Utc>,
    ) -> Result<InviteLink> {
        let email = request
            .email
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AppError::validation("INVITE_MUST_HAVE_EMAIL"))?;
        if !is_valid_email(&email) {
            return Err(AppError::validation("INVITE_MUST_HAVE_VALID_EMAIL"));
        }
        let role = request
            .role
            .ok_or_else(|| AppError::validation("INVITE_MUST_HAVE_ROLE"))?;

        let supervisor_id = match (issuer.role, role) {
            (UserRole::Supervisor, UserRole::TeamMember) => Some(issuer.id()?),
            (UserRole::Supervisor, _) => return Err(AppError::PermissionDenied),
            (UserRole::Executive, UserRole::TeamMember) => Some(
                request
                    .supervisor_id
                    .as_deref()
                    .map(parse_id)
                    .transpose()?
                    .ok_or_else(|| AppError::validation("INVITE_MUST_HAVE_SUPERVISOR"))?,
            ),
            (UserRole::Executive, _) => None,
            (UserRole::TeamMember, _) => return Err(AppError::PermissionDenied),
        };

        Ok(InviteLink {
            _id: None,
            code: uuid::Uuid::new_v4().simple().to_string(),
            company_id,
            role,
            email,
            supervisor_id,
            created_by: issuer.id()?,
            created_at: BsonDateTime::from_chrono(now),
            expires_at: BsonDateTime::from_chrono(now + Duration::days(ttl_days)),
            used_at: None,
        })
    }

    pub fn check_usable(&self, email: &str, now: DateTime<Utc>) -> Result<()> {
        if self.used_at.is_some() {
            return Err(AppError::conflict("INVITE_ALREADY_USED"));
        }
        if self.expires_at.to_chrono() <= now {
            return Err(AppError::conflict("INVITE_EXPIRED"));
        }
        if !self.email.eq_ignore_ascii_case(email) {
            return Err(AppError::PermissionDenied);
        }
        Ok(())
    }

    pub async fn save(&mut self, db: &Database) -> Result<ObjectId> {
        let _id = ObjectId::new();
        self._id = Some(_id);
        Self::collection(db).insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn find_by_code(db: &Database, code: &str) -> Result<Option<InviteLink>> {
        Ok(Self::collection(db).find_one(doc! { "code": code }, None).await?)
    }
    /// Claims the invite. Fails if it was used in the meantime.
    pub async fn mark_used(&mut self, db: &Database, now: DateTime<Utc>) -> Result<()> {
        let used_at = BsonDateTime::from_chrono(now);
        let result = Self::collection(db)
            .update_one(
                doc! { "code": &self.code, "used_at": null },
                doc! { "$set": { "used_at": used_at } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::conflict("INVITE_ALREADY_USED"));
        }
        self.used_at = Some(used_at);
        Ok(())
    }
}

impl From<&InviteLink> for InviteResponse {
    fn from(invite: &InviteLink) -> Self {
        InviteResponse {
            code: invite.code.clone(),
            role: invite.role,
            email: invite.email.clone(),
            expires_at: invite.expires_at.to_chrono(),
        }
    }
}
