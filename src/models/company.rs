use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    Collection, Database,
};
use pwhash::bcrypt;
use serde::{Deserialize, Serialize};

use super::user::UserRole;
use crate::database::COMPANIES;
use crate::error::{AppError, Result};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize, Serialize)]
pub struct Company {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub passwords: CompanyPasswords,
    pub created_by: ObjectId,
    pub created_at: BsonDateTime,
}
/// bcrypt hashes of the per-role join passwords.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CompanyPasswords {
    pub executive: Option<String>,
    pub supervisor: Option<String>,
    pub team_member: Option<String>,
}
#[derive(Debug, Deserialize)]
pub struct CompanyRequest {
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub passwords: CompanyPasswordsRequest,
}
#[derive(Debug, Default, Deserialize)]
pub struct CompanyPasswordsRequest {
    pub executive: Option<String>,
    pub supervisor: Option<String>,
    pub team_member: Option<String>,
}
#[derive(Debug, Deserialize)]
pub struct CompanyJoinRequest {
    pub password: String,
    pub supervisor_id: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub _id: String,
    pub name: String,
    pub size: u32,
    pub created_at: DateTime<Utc>,
}

fn hash_password(password: Option<String>) -> Result<Option<String>> {
    match password {
        None => Ok(None),
        Some(password) if password.len() < MIN_PASSWORD_LENGTH => {
            Err(AppError::validation("COMPANY_MUST_HAVE_VALID_PASSWORD"))
        }
        Some(password) => bcrypt::hash(password)
            .map(Some)
            .map_err(|_| AppError::Internal("HASHING_FAILED".to_string())),
    }
}

fn matches(hash: &Option<String>, password: &str) -> bool {
    hash.as_deref()
        .map(|hash| bcrypt::verify(password, hash))
        .unwrap_or(false)
}

impl Company {
    fn collection(db: &Database) -> Collection<Company> {
        db.collection::<Company>(COMPANIES)
    }

    pub fn from_request(
        request: CompanyRequest,
        created_by: ObjectId,
        now: DateTime<Utc>,
    ) -> Result<Company> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("COMPANY_MUST_HAVE_NAME"));
        }
        if request.size == 0 {
            return Err(AppError::validation("COMPANY_MUST_HAVE_VALID_SIZE"));
        }
        Ok(Company {
            _id: None,
            name,
            size: request.size,
            passwords: CompanyPasswords {
                executive: hash_password(request.passwords.executive)?,
                supervisor: hash_password(request.passwords.supervisor)?,
                team_member: hash_password(request.passwords.team_member)?,
            },
            created_by,
            created_at: BsonDateTime::from_chrono(now),
        })
    }

    /// Role granted by a join password, checking the most privileged role first.
    pub fn role_for_password(&self, password: &str) -> Option<UserRole> {
        if matches(&self.passwords.executive, password) {
            Some(UserRole::Executive)
        } else if matches(&self.passwords.supervisor, password) {
            Some(UserRole::Supervisor)
        } else if matches(&self.passwords.team_member, password) {
            Some(UserRole::TeamMember)
        } else {
            None
        }
    }

    pub async fn save(&mut self, db: &Database) -> Result<ObjectId> {
        let _id = ObjectId::new();
        self._id = Some(_id);
        Self::collection(db).insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn find_by_id(db: &Database, _id: &ObjectId) -> Result<Option<Company>> {
        Ok(Self::collection(db).find_one(doc! { "_id": _id }, None).await?)
    }
}

impl From<&Company> for CompanyResponse {
    fn from(company: &Company) -> Self {
        CompanyResponse {
            _id: company._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: company.name.clone(),
            size: company.size,
            created_at: company.created_at.to_chrono(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(team_member: Option<&str>) -> CompanyRequest {
        CompanyRequest {
            name: "Acme".to_string(),
            size: 40,
            passwords: CompanyPasswordsRequest {
                executive: Some("exec-secret".to_string()),
                supervisor: Some("lead-secret".to_string()),
                team_member: team_member.map(str::to_string),
            },
        }
    }

    #[test]
    fn join_passwords_are_hashed_and_resolve_roles() {
        let company =
            Company::from_request(request(Some("team-secret")), ObjectId::new(), Utc::now())
                .unwrap();
        assert_ne!(company.passwords.supervisor.as_deref(), Some("lead-secret"));

        assert_eq!(company.role_for_password("exec-secret"), Some(UserRole::Executive));
        assert_eq!(company.role_for_password("lead-secret"), Some(UserRole::Supervisor));
        assert_eq!(company.role_for_password("team-secret"), Some(UserRole::TeamMember));
        assert_eq!(company.role_for_password("guess-again"), None);
    }

    #[test]
    fn missing_password_never_matches() {
        let company = Company::from_request(request(None), ObjectId::new(), Utc::now()).unwrap();
        assert_eq!(company.role_for_password(""), None);
    }

    #[test]
    fn rejects_short_passwords() {
        let result = Company::from_request(request(Some("short")), ObjectId::new(), Utc::now());
        assert!(matches!(
            result,
            Err(AppError::Validation(code)) if code == "COMPANY_MUST_HAVE_VALID_PASSWORD"
        ));
    }
}
