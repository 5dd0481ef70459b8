use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{bson::oid::ObjectId, Database};

use crate::error::Result;
use crate::models::{
    bold_action::BoldAction, standup::Standup, training_progress::TrainingProgress, user::User,
};

/// Read side of the document store as seen by the aggregation code.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn bold_actions_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BoldAction>>;

    async fn standups_since(&self, user_id: &ObjectId, since: DateTime<Utc>)
        -> Result<Vec<Standup>>;

    async fn training_progress_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrainingProgress>>;

    async fn completed_bold_action_count(&self, user_id: &ObjectId) -> Result<u32>;
}

/// User lookups needed to authenticate callers and pick dashboard members.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user(&self, user_id: &ObjectId) -> Result<Option<User>>;

    async fn user_by_auth_uid(&self, auth_uid: &str) -> Result<Option<User>>;

    async fn company_users(&self, company_id: &ObjectId) -> Result<Vec<User>>;

    async fn team(&self, supervisor_id: &ObjectId) -> Result<Vec<User>>;
}

pub struct MongoProgressSource {
    db: Database,
}

impl MongoProgressSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressSource for MongoProgressSource {
    async fn bold_actions_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BoldAction>> {
        BoldAction::find_by_user_since(&self.db, user_id, since).await
    }

    async fn standups_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Standup>> {
        Standup::find_by_member_since(&self.db, user_id, since).await
    }

    async fn training_progress_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrainingProgress>> {
        TrainingProgress::find_by_user_since(&self.db, user_id, since).await
    }

    async fn completed_bold_action_count(&self, user_id: &ObjectId) -> Result<u32> {
        BoldAction::count_completed(&self.db, user_id).await
    }
}

#[async_trait]
impl UserDirectory for MongoProgressSource {
    async fn user(&self, user_id: &ObjectId) -> Result<Option<User>> {
        User::find_by_id(&self.db, user_id).await
    }

    async fn user_by_auth_uid(&self, auth_uid: &str) -> Result<Option<User>> {
        User::find_by_auth_uid(&self.db, auth_uid).await
    }

    async fn company_users(&self, company_id: &ObjectId) -> Result<Vec<User>> {
        User::find_by_company(&self.db, company_id).await
    }

    async fn team(&self, supervisor_id: &ObjectId) -> Result<Vec<User>> {
        User::find_team(&self.db, supervisor_id).await
    }
}

/// Everything the reducer needs to know about one user.
#[derive(Debug, Clone, Default)]
pub struct UserRecords {
    pub bold_actions: Vec<BoldAction>,
    pub standups: Vec<Standup>,
    pub training_progress: Vec<TrainingProgress>,
    /// Set when any read failed; the other fields are then empty.
    pub failed: bool,
}

impl UserRecords {
    pub fn failed() -> Self {
        UserRecords {
            failed: true,
            ..UserRecords::default()
        }
    }
}

/// Reads the three record kinds for `user_id` concurrently.
///
/// A failed read is not an error for the caller: it is logged and the user
/// is reported with empty records so the rest of the dashboard still renders.
pub async fn fetch_user_records(
    source: &dyn ProgressSource,
    user_id: &ObjectId,
    since: DateTime<Utc>,
) -> UserRecords {
    let (bold_actions, standups, training_progress) = futures::join!(
        source.bold_actions_since(user_id, since),
        source.standups_since(user_id, since),
        source.training_progress_since(user_id, since),
    );

    match (bold_actions, standups, training_progress) {
        (Ok(bold_actions), Ok(standups), Ok(training_progress)) => UserRecords {
            bold_actions,
            standups,
            training_progress,
            failed: false,
        },
        (bold_actions, standups, training_progress) => {
            let errors = [
                bold_actions.err(),
                standups.err(),
                training_progress.err(),
            ];
            for error in errors.iter().flatten() {
                tracing::warn!(
                    user_id = %user_id,
                    %error,
                    "progress read failed, using empty records"
                );
            }
            UserRecords::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::memory::{completed_bold_action, MemorySource};
    use chrono::TimeZone;

    #[actix_web::test]
    async fn returns_records_newer_than_the_bound() {
        let user = ObjectId::new();
        let old = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let recent = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
        let mut source = MemorySource::default();
        source.add_bold_action(completed_bold_action(user, old));
        source.add_bold_action(completed_bold_action(user, recent));

        let since = Utc.with_ymd_and_hms(2024, 2, 19, 0, 0, 0).unwrap();
        let records = fetch_user_records(&source, &user, since).await;
        assert!(!records.failed);
        assert_eq!(records.bold_actions.len(), 1);
    }

    #[actix_web::test]
    async fn read_failures_become_empty_records() {
        let user = ObjectId::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
        let mut source = MemorySource::default();
        source.add_bold_action(completed_bold_action(user, now));
        source.fail_for(user);

        let records = fetch_user_records(&source, &user, now - chrono::Duration::days(30)).await;
        assert!(records.failed);
        assert!(records.bold_actions.is_empty());
    }
}
