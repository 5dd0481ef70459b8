use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::{FindOptions, UpdateOptions},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use crate::database::TRAINING_PROGRESS;
use crate::error::Result;
use crate::progress::reducer::Completion;

/// Per user, per training. The two flags are independent: a worksheet can be
/// submitted before the video is marked as watched.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TrainingProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub training_id: ObjectId,
    #[serde(default)]
    pub video_completed: bool,
    #[serde(default)]
    pub worksheet_completed: bool,
    pub video_completed_at: Option<BsonDateTime>,
    pub worksheet_completed_at: Option<BsonDateTime>,
    pub created_at: BsonDateTime,
}
#[derive(Debug, Serialize)]
pub struct TrainingProgressResponse {
    pub training_id: String,
    pub video_completed: bool,
    pub worksheet_completed: bool,
    pub video_completed_at: Option<DateTime<Utc>>,
    pub worksheet_completed_at: Option<DateTime<Utc>>,
}

impl TrainingProgress {
    fn collection(db: &Database) -> Collection<TrainingProgress> {
        db.collection::<TrainingProgress>(TRAINING_PROGRESS)
    }

    /// Sets one completion flag, creating the progress document on first use.
    async fn mark(
        db: &Database,
        user_id: &ObjectId,
        training_id: &ObjectId,
        flag: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let now = BsonDateTime::from_chrono(now);
        let options = UpdateOptions::builder().upsert(true).build();
        let mut set = doc! {};
        set.insert(format!("{flag}_completed"), true);
        set.insert(format!("{flag}_completed_at"), now);

        Self::collection(db)
            .update_one(
                doc! { "user_id": user_id, "training_id": training_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "created_at": now },
                },
                options,
            )
            .await?;
        Ok(())
    }
    pub async fn mark_video_completed(
        db: &Database,
        user_id: &ObjectId,
        training_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Self::mark(db, user_id, training_id, "video", now).await
    }
    pub async fn mark_worksheet_completed(
        db: &Database,
        user_id: &ObjectId,
        training_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Self::mark(db, user_id, training_id, "worksheet", now).await
    }
    pub async fn find_by_user(db: &Database, user_id: &ObjectId) -> Result<Vec<TrainingProgress>> {
        let cursor = Self::collection(db)
            .find(doc! { "user_id": user_id }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
    /// Entries created, or whose video was watched, at or after `since`.
    pub async fn find_by_user_since(
        db: &Database,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrainingProgress>> {
        let since = BsonDateTime::from_chrono(since);
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let cursor = Self::collection(db)
            .find(
                doc! {
                    "user_id": user_id,
                    "$or": [
                        { "created_at": { "$gte": since } },
                        { "video_completed_at": { "$gte": since } },
                    ],
                },
                options,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

/// A training counts as done once its video was watched.
impl Completion for TrainingProgress {
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        if self.video_completed {
            Some(self.video_completed_at.unwrap_or(self.created_at).to_chrono())
        } else {
            None
        }
    }
}

impl From<&TrainingProgress> for TrainingProgressResponse {
    fn from(progress: &TrainingProgress) -> Self {
        TrainingProgressResponse {
            training_id: progress.training_id.to_hex(),
            video_completed: progress.video_completed,
            worksheet_completed: progress.worksheet_completed,
            video_completed_at: progress.video_completed_at.map(|at| at.to_chrono()),
            worksheet_completed_at: progress.worksheet_completed_at.map(|at| at.to_chrono()),
        }
    }
}
