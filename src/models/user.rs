use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::FindOptions,
    Collection, Database,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::database::USERS;
use crate::error::{AppError, Result};
use crate::progress::reducer::UserProgress;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    TeamMember,
    Supervisor,
    Executive,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    /// Firebase uid of the account.
    pub auth_uid: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub company_id: Option<ObjectId>,
    pub supervisor_id: Option<ObjectId>,
    // Cached copies of counts derived from source records; refreshed on read.
    #[serde(default)]
    pub completed_trainings: u32,
    #[serde(default)]
    pub completed_worksheets: u32,
    #[serde(default)]
    pub completed_bold_actions: u32,
    #[serde(default)]
    pub overall_progress: f64,
}
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub name: String,
}
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub _id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub company_id: Option<String>,
    pub supervisor_id: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(
                r"^([a-z0-9_+]([a-z0-9_+.]*[a-z0-9_+])?)@([a-z0-9]+([\-\.]{1}[a-z0-9]+)*\.[a-z]{2,6})$",
            )
            .expect("email pattern is valid")
        })
        .is_match(&email.to_lowercase())
}

impl User {
    fn collection(db: &Database) -> Collection<User> {
        db.collection::<User>(USERS)
    }

    pub fn id(&self) -> Result<ObjectId> {
        self._id
            .ok_or_else(|| AppError::Internal("user without id".to_string()))
    }

    /// A fresh account that has not joined a company yet.
    pub fn register(auth_uid: &str, email: &str, payload: UserRequest) -> Result<User> {
        let name = payload.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("USER_MUST_HAVE_NAME"));
        }
        if !is_valid_email(email) {
            return Err(AppError::validation("USER_MUST_HAVE_VALID_EMAIL"));
        }
        Ok(User {
            _id: None,
            auth_uid: auth_uid.to_string(),
            name,
            email: email.to_lowercase(),
            role: UserRole::TeamMember,
            company_id: None,
            supervisor_id: None,
            completed_trainings: 0,
            completed_worksheets: 0,
            completed_bold_actions: 0,
            overall_progress: 0.0,
        })
    }

    pub async fn save(&mut self, db: &Database) -> Result<ObjectId> {
        if Self::find_by_auth_uid(db, &self.auth_uid).await?.is_some() {
            return Err(AppError::conflict("USER_ALREADY_EXIST"));
        }
        let _id = ObjectId::new();
        self._id = Some(_id);
        Self::collection(db).insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn find_by_id(db: &Database, _id: &ObjectId) -> Result<Option<User>> {
        Ok(Self::collection(db).find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_by_auth_uid(db: &Database, auth_uid: &str) -> Result<Option<User>> {
        Ok(Self::collection(db)
            .find_one(doc! { "auth_uid": auth_uid }, None)
            .await?)
    }
    pub async fn find_by_company(db: &Database, company_id: &ObjectId) -> Result<Vec<User>> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = Self::collection(db)
            .find(doc! { "company_id": company_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
    pub async fn find_team(db: &Database, supervisor_id: &ObjectId) -> Result<Vec<User>> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = Self::collection(db)
            .find(doc! { "supervisor_id": supervisor_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
    pub async fn join_company(
        &mut self,
        db: &Database,
        company_id: ObjectId,
        role: UserRole,
        supervisor_id: Option<ObjectId>,
    ) -> Result<ObjectId> {
        let _id = self.id()?;
        self.company_id = Some(company_id);
        self.role = role;
        self.supervisor_id = supervisor_id;

        Self::collection(db)
            .update_one(
                doc! { "_id": _id },
                doc! { "$set": {
                    "company_id": company_id,
                    "role": mongodb::bson::to_bson(&role)?,
                    "supervisor_id": supervisor_id,
                } },
                None,
            )
            .await?;
        Ok(_id)
    }
    /// Merge-updates the cached counters with freshly derived values.
    pub async fn refresh_counters(&mut self, db: &Database, progress: &UserProgress) -> Result<()> {
        let _id = self.id()?;
        self.completed_trainings = progress.completed_trainings;
        self.completed_worksheets = progress.completed_worksheets;
        self.completed_bold_actions = progress.completed_bold_actions;
        self.overall_progress = progress.overall_progress;

        Self::collection(db)
            .update_one(
                doc! { "_id": _id },
                doc! { "$set": {
                    "completed_trainings": i64::from(progress.completed_trainings),
                    "completed_worksheets": i64::from(progress.completed_worksheets),
                    "completed_bold_actions": i64::from(progress.completed_bold_actions),
                    "overall_progress": progress.overall_progress,
                } },
                None,
            )
            .await?;
        Ok(())
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            _id: user._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            company_id: user.company_id.map(|id| id.to_hex()),
            supervisor_id: user.supervisor_id.map(|id| id.to_hex()),
        }
    }
}
