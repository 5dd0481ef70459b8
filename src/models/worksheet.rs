use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    bold_action::{BoldAction, BoldActionRequest},
    training_progress::TrainingProgress,
};
use crate::database::WORKSHEETS;
use crate::error::{AppError, Result};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorksheetAnswer {
    pub question: String,
    pub answer: String,
}

/// Reflection submitted after a training video. Every worksheet sets the
/// user's next bold action.
#[derive(Debug, Deserialize, Serialize)]
pub struct Worksheet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub training_id: ObjectId,
    pub answers: Vec<WorksheetAnswer>,
    pub bold_action_id: ObjectId,
    pub submitted_at: BsonDateTime,
}
#[derive(Debug, Deserialize)]
pub struct WorksheetRequest {
    pub answers: Vec<WorksheetAnswer>,
    pub bold_action: BoldActionRequest,
}
#[derive(Debug, Serialize)]
pub struct WorksheetSubmission {
    pub worksheet_id: String,
    pub bold_action_id: String,
}

fn validate_answers(answers: &[WorksheetAnswer]) -> Result<()> {
    if answers.is_empty()
        || answers
            .iter()
            .any(|entry| entry.question.trim().is_empty() || entry.answer.trim().is_empty())
    {
        return Err(AppError::validation("WORKSHEET_MUST_HAVE_ANSWERS"));
    }
    Ok(())
}

impl Worksheet {
    fn collection(db: &Database) -> Collection<Worksheet> {
        db.collection::<Worksheet>(WORKSHEETS)
    }

    /// Stores the worksheet, creates its bold action and flags the training's
    /// worksheet as done. The three writes are independent documents.
    pub async fn submit(
        db: &Database,
        user_id: ObjectId,
        training_id: ObjectId,
        request: WorksheetRequest,
        now: DateTime<Utc>,
    ) -> Result<WorksheetSubmission> {
        validate_answers(&request.answers)?;
        let mut action = BoldAction::new(user_id, Some(training_id), request.bold_action, now)?;
        let bold_action_id = action.save(db).await?;

        let worksheet_id = ObjectId::new();
        let worksheet = Worksheet {
            _id: Some(worksheet_id),
            user_id,
            training_id,
            answers: request.answers,
            bold_action_id,
            submitted_at: BsonDateTime::from_chrono(now),
        };
        Self::collection(db).insert_one(&worksheet, None).await?;
        TrainingProgress::mark_worksheet_completed(db, &user_id, &training_id, now).await?;

        Ok(WorksheetSubmission {
            worksheet_id: worksheet_id.to_hex(),
            bold_action_id: bold_action_id.to_hex(),
        })
    }
}
