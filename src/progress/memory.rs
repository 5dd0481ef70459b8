//! In-memory [`ProgressSource`] and record builders for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

use super::reducer::Completion;
use super::source::{ProgressSource, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::{
    bold_action::{BoldAction, BoldActionStatus},
    standup::{Standup, StandupStatus},
    training_progress::TrainingProgress,
    user::{User, UserRole},
};

#[derive(Default)]
pub struct MemorySource {
    bold_actions: HashMap<ObjectId, Vec<BoldAction>>,
    standups: HashMap<ObjectId, Vec<Standup>>,
    training_progress: HashMap<ObjectId, Vec<TrainingProgress>>,
    users: Vec<User>,
    failing: HashSet<ObjectId>,
}

impl MemorySource {
    pub fn add_bold_action(&mut self, action: BoldAction) {
        self.bold_actions.entry(action.user_id).or_default().push(action);
    }
    pub fn add_standup(&mut self, standup: Standup) {
        self.standups
            .entry(standup.team_member_id)
            .or_default()
            .push(standup);
    }
    pub fn add_training_progress(&mut self, progress: TrainingProgress) {
        self.training_progress
            .entry(progress.user_id)
            .or_default()
            .push(progress);
    }
    pub fn add_user(&mut self, user: User) {
        self.users.push(user);
    }
    pub fn fail_for(&mut self, user_id: ObjectId) {
        self.failing.insert(user_id);
    }

    fn check(&self, user_id: &ObjectId) -> Result<()> {
        if self.failing.contains(user_id) {
            Err(AppError::Database("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Mirrors the store queries: a record matches when it started or finished
/// at or after `since`.
fn touched_since<R: Completion>(started: BsonDateTime, record: &R, since: DateTime<Utc>) -> bool {
    started.to_chrono() >= since || record.completed_at().is_some_and(|at| at >= since)
}

#[async_trait]
impl ProgressSource for MemorySource {
    async fn bold_actions_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BoldAction>> {
        self.check(user_id)?;
        Ok(self
            .bold_actions
            .get(user_id)
            .map(|actions| {
                actions
                    .iter()
                    .filter(|action| touched_since(action.created_at, *action, since))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn standups_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Standup>> {
        self.check(user_id)?;
        Ok(self
            .standups
            .get(user_id)
            .map(|standups| {
                standups
                    .iter()
                    .filter(|standup| touched_since(standup.scheduled_at, *standup, since))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn training_progress_since(
        &self,
        user_id: &ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrainingProgress>> {
        self.check(user_id)?;
        Ok(self
            .training_progress
            .get(user_id)
            .map(|progress| {
                progress
                    .iter()
                    .filter(|entry| touched_since(entry.created_at, *entry, since))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn completed_bold_action_count(&self, user_id: &ObjectId) -> Result<u32> {
        self.check(user_id)?;
        Ok(self
            .bold_actions
            .get(user_id)
            .map(|actions| {
                actions
                    .iter()
                    .filter(|action| action.status == BoldActionStatus::Completed)
                    .count() as u32
            })
            .unwrap_or(0))
    }
}

#[async_trait]
impl UserDirectory for MemorySource {
    async fn user(&self, user_id: &ObjectId) -> Result<Option<User>> {
        Ok(self.users.iter().find(|user| user._id == Some(*user_id)).cloned())
    }

    async fn user_by_auth_uid(&self, auth_uid: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|user| user.auth_uid == auth_uid).cloned())
    }

    async fn company_users(&self, company_id: &ObjectId) -> Result<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|user| user.company_id == Some(*company_id))
            .cloned()
            .collect())
    }

    async fn team(&self, supervisor_id: &ObjectId) -> Result<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|user| user.supervisor_id == Some(*supervisor_id))
            .cloned()
            .collect())
    }
}

pub fn supervisor(name: &str, company_id: ObjectId) -> User {
    user(name, UserRole::Supervisor, company_id, None)
}

pub fn team_member(name: &str, company_id: ObjectId, supervisor: &User) -> User {
    user(name, UserRole::TeamMember, company_id, supervisor._id)
}

pub fn user(
    name: &str,
    role: UserRole,
    company_id: ObjectId,
    supervisor_id: Option<ObjectId>,
) -> User {
    User {
        _id: Some(ObjectId::new()),
        auth_uid: format!("uid-{name}"),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role,
        company_id: Some(company_id),
        supervisor_id,
        completed_trainings: 0,
        completed_worksheets: 0,
        completed_bold_actions: 0,
        overall_progress: 0.0,
    }
}

pub fn completed_bold_action(user_id: ObjectId, at: DateTime<Utc>) -> BoldAction {
    BoldAction {
        status: BoldActionStatus::Completed,
        completed_at: Some(BsonDateTime::from_chrono(at)),
        ..active_bold_action(user_id, at)
    }
}

pub fn active_bold_action(user_id: ObjectId, created: DateTime<Utc>) -> BoldAction {
    BoldAction {
        _id: Some(ObjectId::new()),
        user_id,
        training_id: None,
        action: "Lead the Monday huddle".to_string(),
        timeframe: "1 week".to_string(),
        actual_timeframe: None,
        reflection: None,
        status: BoldActionStatus::Active,
        created_at: BsonDateTime::from_chrono(created),
        completed_at: None,
    }
}

pub fn completed_standup(member: ObjectId, supervisor: ObjectId, at: DateTime<Utc>) -> Standup {
    Standup {
        _id: Some(ObjectId::new()),
        supervisor_id: supervisor,
        team_member_id: member,
        scheduled_at: BsonDateTime::from_chrono(at),
        meeting_link: "https://meet.example.com/standup".to_string(),
        status: StandupStatus::Completed,
        notes: None,
        created_at: BsonDateTime::from_chrono(at),
        completed_at: Some(BsonDateTime::from_chrono(at)),
    }
}

pub fn video_progress(user_id: ObjectId, at: DateTime<Utc>) -> TrainingProgress {
    TrainingProgress {
        _id: Some(ObjectId::new()),
        user_id,
        training_id: ObjectId::new(),
        video_completed: true,
        worksheet_completed: false,
        video_completed_at: Some(BsonDateTime::from_chrono(at)),
        worksheet_completed_at: None,
        created_at: BsonDateTime::from_chrono(at),
    }
}
