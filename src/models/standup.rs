use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use crate::database::STANDUPS;
use crate::error::{AppError, Result};
use crate::progress::reducer::Completion;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StandupStatus {
    Scheduled,
    Completed,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Standup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub supervisor_id: ObjectId,
    pub team_member_id: ObjectId,
    pub scheduled_at: BsonDateTime,
    pub meeting_link: String,
    pub status: StandupStatus,
    pub notes: Option<String>,
    pub created_at: BsonDateTime,
    pub completed_at: Option<BsonDateTime>,
}
#[derive(Debug, Deserialize)]
pub struct StandupRequest {
    pub team_member_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
}
#[derive(Debug, Default, Deserialize)]
pub struct StandupCompletion {
    pub notes: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct StandupResponse {
    pub _id: String,
    pub supervisor_id: String,
    pub team_member_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
    pub status: StandupStatus,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Standup {
    fn collection(db: &Database) -> Collection<Standup> {
        db.collection::<Standup>(STANDUPS)
    }

    pub fn schedule(
        supervisor_id: ObjectId,
        team_member_id: ObjectId,
        scheduled_at: DateTime<Utc>,
        meeting_link: &str,
        now: DateTime<Utc>,
    ) -> Result<Standup> {
        let meeting_link = meeting_link.trim();
        if !(meeting_link.starts_with("https://") || meeting_link.starts_with("http://")) {
            return Err(AppError::validation("STANDUP_MUST_HAVE_VALID_LINK"));
        }
        Ok(Standup {
            _id: None,
            supervisor_id,
            team_member_id,
            scheduled_at: BsonDateTime::from_chrono(scheduled_at),
            meeting_link: meeting_link.to_string(),
            status: StandupStatus::Scheduled,
            notes: None,
            created_at: BsonDateTime::from_chrono(now),
            completed_at: None,
        })
    }

    pub fn complete(&mut self, completion: StandupCompletion, now: DateTime<Utc>) -> Result<()> {
        if self.status == StandupStatus::Completed {
            return Err(AppError::conflict("STANDUP_ALREADY_COMPLETED"));
        }
        self.status = StandupStatus::Completed;
        self.notes = completion.notes.filter(|notes| !notes.trim().is_empty());
        self.completed_at = Some(BsonDateTime::from_chrono(now));
        Ok(())
    }

    pub async fn save(&mut self, db: &Database) -> Result<ObjectId> {
        let _id = ObjectId::new();
        self._id = Some(_id);
        Self::collection(db).insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn save_completion(&self, db: &Database) -> Result<ObjectId> {
        let _id = self
            ._id
            .ok_or_else(|| AppError::not_found("STANDUP_NOT_FOUND"))?;
        let result = Self::collection(db)
            .update_one(
                doc! { "_id": _id, "status": "scheduled" },
                doc! { "$set": {
                    "status": "completed",
                    "notes": self.notes.clone(),
                    "completed_at": self.completed_at,
                } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::conflict("STANDUP_ALREADY_COMPLETED"));
        }
        Ok(_id)
    }
    pub async fn find_by_id(db: &Database, _id: &ObjectId) -> Result<Option<Standup>> {
        Ok(Self::collection(db).find_one(doc! { "_id": _id }, None).await?)
    }
    /// Standups the user takes part in, either as supervisor or as team member.
    pub async fn find_for_user(db: &Database, user_id: &ObjectId) -> Result<Vec<Standup>> {
        let options = FindOptions::builder().sort(doc! { "scheduled_at": 1 }).build();
        let cursor = Self::collection(db)
            .find(
                doc! { "$or": [
                    { "supervisor_id": user_id },
                    { "team_member_id": user_id },
                ] },
                options,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
    /// Standups scheduled or completed at or after `since`.
    pub async fn find_by_member_since(
        db: &Database,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Standup>> {
        let since = BsonDateTime::from_chrono(since);
        let options = FindOptions::builder().sort(doc! { "scheduled_at": 1 }).build();
        let cursor = Self::collection(db)
            .find(
                doc! {
                    "team_member_id": user_id,
                    "$or": [
                        { "scheduled_at": { "$gte": since } },
                        { "completed_at": { "$gte": since } },
                    ],
                },
                options,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

impl Completion for Standup {
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            StandupStatus::Completed => {
                Some(self.completed_at.unwrap_or(self.scheduled_at).to_chrono())
            }
            StandupStatus::Scheduled => None,
        }
    }
}

impl From<&Standup> for StandupResponse {
    fn from(standup: &Standup) -> Self {
        StandupResponse {
            _id: standup._id.map(|id| id.to_hex()).unwrap_or_default(),
            supervisor_id: standup.supervisor_id.to_hex(),
            team_member_id: standup.team_member_id.to_hex(),
            scheduled_at: standup.scheduled_at.to_chrono(),
            meeting_link: standup.meeting_link.clone(),
            status: standup.status,
            notes: standup.notes.clone(),
            completed_at: standup.completed_at.map(|at| at.to_chrono()),
        }
    }
}
