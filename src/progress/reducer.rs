use chrono::{DateTime, Utc};
use futures::future::join_all;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use super::{
    format::{percentage, Rate, Thresholds},
    source::{fetch_user_records, ProgressSource, UserRecords},
    week::{four_week_start, in_four_week_window, is_this_week},
};
use crate::models::{
    bold_action::BoldAction,
    training_progress::TrainingProgress,
    user::{User, UserRole},
};

/// Weeks covered by the four-week window.
const WINDOW_WEEKS: u32 = 4;

/// A record that can be counted once it is done.
pub trait Completion {
    /// `None` while the record is still open.
    fn completed_at(&self) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub trainings: u32,
    pub bold_actions: u32,
    pub standups: u32,
}

impl CategoryCounts {
    fn add(&mut self, other: &CategoryCounts) {
        self.trainings += other.trainings;
        self.bold_actions += other.bold_actions;
        self.standups += other.standups;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRates {
    pub trainings: Rate,
    pub bold_actions: Rate,
    pub standups: Rate,
}

impl CategoryRates {
    fn new(counts: &CategoryCounts, denominator: u32, thresholds: &Thresholds) -> Self {
        CategoryRates {
            trainings: Rate::new(counts.trainings, denominator, thresholds),
            bold_actions: Rate::new(counts.bold_actions, denominator, thresholds),
            standups: Rate::new(counts.standups, denominator, thresholds),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberMetrics {
    pub user_id: String,
    pub name: String,
    #[serde(skip)]
    pub supervisor_id: Option<ObjectId>,
    /// 1 per category when at least one record was completed this week.
    pub weekly: CategoryCounts,
    /// Completed records inside the four-week window.
    pub four_week: CategoryCounts,
    pub fetch_failed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMetrics {
    pub supervisor_id: String,
    pub supervisor_name: String,
    pub team_size: u32,
    pub weekly: CategoryRates,
    pub four_week: CategoryRates,
    pub members: Vec<MemberMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyMetrics {
    /// Every team member that was aggregated, including the ones whose reads failed.
    pub user_count: u32,
    pub failed_count: u32,
    pub weekly: CategoryRates,
    pub four_week: CategoryRates,
    pub teams: Vec<TeamMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub completed_bold_actions: u32,
}

/// Counters derived from source records on every read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UserProgress {
    pub completed_trainings: u32,
    pub completed_worksheets: u32,
    pub completed_bold_actions: u32,
    pub overall_progress: f64,
}

/// 1 if any record in `records` was completed during the current week.
///
/// Five completions and one completion weigh the same.
fn weekly_presence<T: Completion>(records: &[T], now: DateTime<Utc>) -> u32 {
    records
        .iter()
        .filter_map(Completion::completed_at)
        .any(|at| is_this_week(at, now)) as u32
}

fn window_total<T: Completion>(records: &[T], now: DateTime<Utc>) -> u32 {
    records
        .iter()
        .filter_map(Completion::completed_at)
        .filter(|at| in_four_week_window(*at, now))
        .count() as u32
}

fn hex_id(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub fn reduce_member(user: &User, records: &UserRecords, now: DateTime<Utc>) -> MemberMetrics {
    MemberMetrics {
        user_id: hex_id(user._id),
        name: user.name.clone(),
        supervisor_id: user.supervisor_id,
        weekly: CategoryCounts {
            trainings: weekly_presence(&records.training_progress, now),
            bold_actions: weekly_presence(&records.bold_actions, now),
            standups: weekly_presence(&records.standups, now),
        },
        four_week: CategoryCounts {
            trainings: window_total(&records.training_progress, now),
            bold_actions: window_total(&records.bold_actions, now),
            standups: window_total(&records.standups, now),
        },
        fetch_failed: records.failed,
    }
}

fn rollup(members: &[MemberMetrics], thresholds: &Thresholds) -> (CategoryRates, CategoryRates) {
    let size = members.len() as u32;
    let mut weekly = CategoryCounts::default();
    let mut four_week = CategoryCounts::default();
    for member in members {
        weekly.add(&member.weekly);
        four_week.add(&member.four_week);
    }
    (
        CategoryRates::new(&weekly, size, thresholds),
        CategoryRates::new(&four_week, size * WINDOW_WEEKS, thresholds),
    )
}

pub fn reduce_team(
    supervisor: &User,
    members: Vec<MemberMetrics>,
    thresholds: &Thresholds,
) -> TeamMetrics {
    let (weekly, four_week) = rollup(&members, thresholds);
    TeamMetrics {
        supervisor_id: hex_id(supervisor._id),
        supervisor_name: supervisor.name.clone(),
        team_size: members.len() as u32,
        weekly,
        four_week,
        members,
    }
}

async fn reduce_members(
    source: &dyn ProgressSource,
    members: &[&User],
    now: DateTime<Utc>,
) -> Vec<MemberMetrics> {
    let since = four_week_start(now);
    let reads = members.iter().map(|member| async move {
        match member._id {
            Some(id) => fetch_user_records(source, &id, since).await,
            None => UserRecords::failed(),
        }
    });
    let records = join_all(reads).await;

    members
        .iter()
        .zip(records.iter())
        .map(|(member, records)| reduce_member(member, records, now))
        .collect()
}

/// Metrics for a single supervisor's team.
pub async fn aggregate_team(
    source: &dyn ProgressSource,
    supervisor: &User,
    members: &[User],
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> TeamMetrics {
    let members: Vec<&User> = members
        .iter()
        .filter(|member| member.role == UserRole::TeamMember)
        .collect();
    let metrics = reduce_members(source, &members, now).await;
    reduce_team(supervisor, metrics, thresholds)
}

/// Company-wide metrics with one entry per supervisor, ordered by supervisor name.
///
/// Team members whose supervisor is not among `users` still count towards
/// the company totals.
pub async fn aggregate_company(
    source: &dyn ProgressSource,
    users: &[User],
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> CompanyMetrics {
    let members: Vec<&User> = users
        .iter()
        .filter(|user| user.role == UserRole::TeamMember)
        .collect();
    let metrics = reduce_members(source, &members, now).await;

    let mut supervisors: Vec<&User> = users
        .iter()
        .filter(|user| user.role == UserRole::Supervisor)
        .collect();
    supervisors.sort_by(|a, b| a.name.cmp(&b.name));

    let teams = supervisors
        .into_iter()
        .map(|supervisor| {
            let team: Vec<MemberMetrics> = metrics
                .iter()
                .filter(|member| {
                    member.supervisor_id.is_some() && member.supervisor_id == supervisor._id
                })
                .cloned()
                .collect();
            reduce_team(supervisor, team, thresholds)
        })
        .collect();

    let (weekly, four_week) = rollup(&metrics, thresholds);
    CompanyMetrics {
        user_count: metrics.len() as u32,
        failed_count: metrics.iter().filter(|member| member.fetch_failed).count() as u32,
        weekly,
        four_week,
        teams,
    }
}

/// Orders entries by completed bold actions, highest first. Ties keep their input order.
pub fn leaderboard(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.completed_bold_actions.cmp(&a.completed_bold_actions));
    entries
}

pub async fn build_leaderboard(
    source: &dyn ProgressSource,
    users: &[User],
) -> Vec<LeaderboardEntry> {
    let counts = join_all(users.iter().map(|user| async move {
        let Some(id) = user._id else { return 0 };
        match source.completed_bold_action_count(&id).await {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(user_id = %id, %error, "bold action count failed, ranking as zero");
                0
            }
        }
    }))
    .await;

    let entries = users
        .iter()
        .zip(counts)
        .map(|(user, completed_bold_actions)| LeaderboardEntry {
            user_id: hex_id(user._id),
            name: user.name.clone(),
            completed_bold_actions,
        })
        .collect();
    leaderboard(entries)
}

impl UserProgress {
    pub fn from_records(
        bold_actions: &[BoldAction],
        training_progress: &[TrainingProgress],
        total_activities: u32,
    ) -> Self {
        let completed_trainings = training_progress
            .iter()
            .filter(|entry| entry.video_completed)
            .count() as u32;
        let completed_worksheets = training_progress
            .iter()
            .filter(|entry| entry.worksheet_completed)
            .count() as u32;
        let completed_bold_actions = bold_actions
            .iter()
            .filter(|action| action.completed_at().is_some())
            .count() as u32;
        let done = completed_trainings + completed_worksheets + completed_bold_actions;

        UserProgress {
            completed_trainings,
            completed_worksheets,
            completed_bold_actions,
            overall_progress: percentage(done, total_activities).min(100.0),
        }
    }
}
