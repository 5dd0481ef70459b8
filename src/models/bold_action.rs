use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use crate::database::BOLD_ACTIONS;
use crate::error::{AppError, Result};
use crate::progress::reducer::Completion;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoldActionStatus {
    Active,
    Completed,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BoldAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub training_id: Option<ObjectId>,
    pub action: String,
    /// What the user committed to, e.g. "2 weeks".
    pub timeframe: String,
    pub actual_timeframe: Option<String>,
    pub reflection: Option<String>,
    pub status: BoldActionStatus,
    pub created_at: BsonDateTime,
    pub completed_at: Option<BsonDateTime>,
}
#[derive(Debug, Deserialize)]
pub struct BoldActionRequest {
    pub action: String,
    pub timeframe: String,
}
#[derive(Debug, Default, Deserialize)]
pub struct BoldActionCompletion {
    pub actual_timeframe: Option<String>,
    pub reflection: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct BoldActionResponse {
    pub _id: String,
    pub training_id: Option<String>,
    pub action: String,
    pub timeframe: String,
    pub actual_timeframe: Option<String>,
    pub reflection: Option<String>,
    pub status: BoldActionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BoldAction {
    fn collection(db: &Database) -> Collection<BoldAction> {
        db.collection::<BoldAction>(BOLD_ACTIONS)
    }

    pub fn new(
        user_id: ObjectId,
        training_id: Option<ObjectId>,
        request: BoldActionRequest,
        now: DateTime<Utc>,
    ) -> Result<BoldAction> {
        let action = request.action.trim().to_string();
        let timeframe = request.timeframe.trim().to_string();
        if action.is_empty() {
            return Err(AppError::validation("BOLD_ACTION_MUST_HAVE_ACTION"));
        }
        if timeframe.is_empty() {
            return Err(AppError::validation("BOLD_ACTION_MUST_HAVE_TIMEFRAME"));
        }
        Ok(BoldAction {
            _id: None,
            user_id,
            training_id,
            action,
            timeframe,
            actual_timeframe: None,
            reflection: None,
            status: BoldActionStatus::Active,
            created_at: BsonDateTime::from_chrono(now),
            completed_at: None,
        })
    }

    /// Moves an active action to `completed`. Completed is terminal.
    pub fn complete(&mut self, completion: BoldActionCompletion, now: DateTime<Utc>) -> Result<()> {
        if self.status == BoldActionStatus::Completed {
            return Err(AppError::conflict("BOLD_ACTION_ALREADY_COMPLETED"));
        }
        self.status = BoldActionStatus::Completed;
        self.actual_timeframe = completion.actual_timeframe;
        self.reflection = completion.reflection;
        self.completed_at = Some(BsonDateTime::from_chrono(now));
        Ok(())
    }

    pub async fn save(&mut self, db: &Database) -> Result<ObjectId> {
        let _id = ObjectId::new();
        self._id = Some(_id);
        Self::collection(db).insert_one(&*self, None).await?;
        Ok(_id)
    }
    /// Persists a completion. Only matches documents that are still active so
    /// a concurrent completion cannot be overwritten.
    pub async fn save_completion(&self, db: &Database) -> Result<ObjectId> {
        let _id = self
            ._id
            .ok_or_else(|| AppError::not_found("BOLD_ACTION_NOT_FOUND"))?;
        let result = Self::collection(db)
            .update_one(
                doc! { "_id": _id, "status": "active" },
                doc! { "$set": {
                    "status": "completed",
                    "actual_timeframe": self.actual_timeframe.clone(),
                    "reflection": self.reflection.clone(),
                    "completed_at": self.completed_at,
                } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::conflict("BOLD_ACTION_ALREADY_COMPLETED"));
        }
        Ok(_id)
    }
    pub async fn find_by_id(db: &Database, _id: &ObjectId) -> Result<Option<BoldAction>> {
        Ok(Self::collection(db).find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_by_user(db: &Database, user_id: &ObjectId) -> Result<Vec<BoldAction>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = Self::collection(db)
            .find(doc! { "user_id": user_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
    /// Actions created or completed at or after `since`.
    pub async fn find_by_user_since(
        db: &Database,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BoldAction>> {
        let since = BsonDateTime::from_chrono(since);
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let cursor = Self::collection(db)
            .find(
                doc! {
                    "user_id": user_id,
                    "$or": [
                        { "created_at": { "$gte": since } },
                        { "completed_at": { "$gte": since } },
                    ],
                },
                options,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
    pub async fn count_completed(db: &Database, user_id: &ObjectId) -> Result<u32> {
        let count = Self::collection(db)
            .count_documents(doc! { "user_id": user_id, "status": "completed" }, None)
            .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

impl Completion for BoldAction {
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            BoldActionStatus::Completed => {
                Some(self.completed_at.unwrap_or(self.created_at).to_chrono())
            }
            BoldActionStatus::Active => None,
        }
    }
}

impl From<&BoldAction> for BoldActionResponse {
    fn from(action: &BoldAction) -> Self {
        BoldActionResponse {
            _id: action._id.map(|id| id.to_hex()).unwrap_or_default(),
            training_id: action.training_id.map(|id| id.to_hex()),
            action: action.action.clone(),
            timeframe: action.timeframe.clone(),
            actual_timeframe: action.actual_timeframe.clone(),
            reflection: action.reflection.clone(),
            status: action.status,
            created_at: action.created_at.to_chrono(),
            completed_at: action.completed_at.map(|at| at.to_chrono()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 15, 0, 0).unwrap()
    }

    fn request(action: &str) -> BoldActionRequest {
        BoldActionRequest {
            action: action.to_string(),
            timeframe: "1 week".to_string(),
        }
    }

    #[test]
    fn new_actions_start_active() {
        let action = BoldAction::new(ObjectId::new(), None, request("Ask for feedback"), now())
            .unwrap();
        assert_eq!(action.status, BoldActionStatus::Active);
        assert!(action.completed_at().is_none());
    }

    #[test]
    fn rejects_empty_actions() {
        let result = BoldAction::new(ObjectId::new(), None, request("  "), now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn completion_is_terminal() {
        let mut action = BoldAction::new(ObjectId::new(), None, request("Ask for feedback"), now())
            .unwrap();
        action
            .complete(
                BoldActionCompletion {
                    actual_timeframe: Some("4 days".to_string()),
                    reflection: Some("Went well".to_string()),
                },
                now(),
            )
            .unwrap();
        assert_eq!(action.status, BoldActionStatus::Completed);
        assert_eq!(action.completed_at(), Some(now()));

        let again = action.complete(BoldActionCompletion::default(), now());
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(action.reflection.as_deref(), Some("Went well"));
    }

    #[test]
    fn legacy_completions_fall_back_to_creation_time() {
        let mut action = BoldAction::new(ObjectId::new(), None, request("Ask for feedback"), now())
            .unwrap();
        action.status = BoldActionStatus::Completed;
        assert_eq!(action.completed_at(), Some(now()));
    }
}
