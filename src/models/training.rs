use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use crate::database::TRAININGS;
use crate::error::{AppError, Result};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Training {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub scheduled_date: BsonDateTime,
    /// Id of the backing item on the content platform, if any.
    pub tribe_content_id: Option<String>,
    #[serde(default)]
    pub order: u32,
    pub created_at: BsonDateTime,
}
#[derive(Debug, Deserialize)]
pub struct TrainingRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub video_url: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub tribe_content_id: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct TrainingResponse {
    pub _id: String,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub tribe_content_id: Option<String>,
    pub order: u32,
}

/// Sorts by scheduled date (stable for equal dates) and renumbers `order` from 0.
pub fn order_by_schedule(trainings: &mut [Training]) {
    trainings.sort_by_key(|training| training.scheduled_date);
    for (index, training) in trainings.iter_mut().enumerate() {
        training.order = index as u32;
    }
}

impl Training {
    fn collection(db: &Database) -> Collection<Training> {
        db.collection::<Training>(TRAININGS)
    }

    pub fn from_request(request: TrainingRequest, now: DateTime<Utc>) -> Result<Training> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("TRAINING_MUST_HAVE_TITLE"));
        }
        let video_url = request.video_url.filter(|url| !url.trim().is_empty());
        let tribe_content_id = request.tribe_content_id.filter(|id| !id.trim().is_empty());
        if video_url.is_none() && tribe_content_id.is_none() {
            return Err(AppError::validation("TRAINING_MUST_HAVE_VIDEO"));
        }
        Ok(Training {
            _id: None,
            title,
            description: request.description,
            video_url,
            scheduled_date: BsonDateTime::from_chrono(request.scheduled_date),
            tribe_content_id,
            order: 0,
            created_at: BsonDateTime::from_chrono(now),
        })
    }

    pub async fn save(&mut self, db: &Database) -> Result<ObjectId> {
        let _id = ObjectId::new();
        self._id = Some(_id);
        self.order = u32::try_from(Self::collection(db).count_documents(doc! {}, None).await?)
            .unwrap_or(u32::MAX);
        Self::collection(db).insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn update(&self, db: &Database) -> Result<ObjectId> {
        let _id = self
            ._id
            .ok_or_else(|| AppError::not_found("TRAINING_NOT_FOUND"))?;
        let mut fields = mongodb::bson::to_document(self)?;
        fields.remove("_id");
        Self::collection(db)
            .update_one(
                doc! { "_id": _id },
                doc! { "$set": fields },
                None,
            )
            .await?;
        Ok(_id)
    }
    pub async fn find_by_id(db: &Database, _id: &ObjectId) -> Result<Option<Training>> {
        Ok(Self::collection(db).find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_many(db: &Database) -> Result<Vec<Training>> {
        let options = FindOptions::builder()
            .sort(doc! { "order": 1, "scheduled_date": 1 })
            .build();
        let cursor = Self::collection(db).find(doc! {}, options).await?;
        Ok(cursor.try_collect().await?)
    }
    /// Renumbers every training by scheduled date. Returns how many were written.
    pub async fn reorder_by_date(db: &Database) -> Result<usize> {
        let mut trainings = Self::find_many(db).await?;
        order_by_schedule(&mut trainings);

        let collection = Self::collection(db);
        for training in trainings.iter() {
            if let Some(_id) = training._id {
                collection
                    .update_one(
                        doc! { "_id": _id },
                        doc! { "$set": { "order": i64::from(training.order) } },
                        None,
                    )
                    .await?;
            }
        }
        tracing::info!(count = trainings.len(), "trainings reordered by schedule");
        Ok(trainings.len())
    }
}

impl From<&Training> for TrainingResponse {
    fn from(training: &Training) -> Self {
        TrainingResponse {
            _id: training._id.map(|id| id.to_hex()).unwrap_or_default(),
            title: training.title.clone(),
            description: training.description.clone(),
            video_url: training.video_url.clone(),
            scheduled_date: training.scheduled_date.to_chrono(),
            tribe_content_id: training.tribe_content_id.clone(),
            order: training.order,
        }
    }
}
