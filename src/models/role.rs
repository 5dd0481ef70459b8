use serde::Serialize;
use std::collections::BTreeSet;

use super::user::{User, UserRole};

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewOwnProgress,
    CompleteTraining,
    SubmitWorksheet,
    CompleteBoldAction,
    ViewContent,
    ViewLeaderboard,
    ViewTeamDashboard,
    ManageStandups,
    InviteTeamMembers,
    ViewCompanyDashboard,
    ManageTrainings,
    ManageCompany,
    InviteAnyRole,
}

/// Everything a role may do. Each role includes the capabilities of the roles below it.
pub fn capabilities(role: UserRole) -> BTreeSet<Capability> {
    use Capability::*;

    let mut set: BTreeSet<Capability> = [
        ViewOwnProgress,
        CompleteTraining,
        SubmitWorksheet,
        CompleteBoldAction,
        ViewContent,
        ViewLeaderboard,
    ]
    .into_iter()
    .collect();

    if matches!(role, UserRole::Supervisor | UserRole::Executive) {
        set.extend([ViewTeamDashboard, ManageStandups, InviteTeamMembers]);
    }
    if role == UserRole::Executive {
        set.extend([ViewCompanyDashboard, ManageTrainings, ManageCompany, InviteAnyRole]);
    }
    set
}

pub fn can(user: &User, capability: Capability) -> bool {
    capabilities(user.role).contains(&capability)
}

/// Whether `viewer` may see `member`'s records: themselves, their supervisor,
/// or an executive of the same company.
pub fn can_view_member(viewer: &User, member: &User) -> bool {
    if viewer._id.is_some() && viewer._id == member._id {
        return true;
    }
    match viewer.role {
        UserRole::Executive => {
            viewer.company_id.is_some() && viewer.company_id == member.company_id
        }
        UserRole::Supervisor => viewer._id.is_some() && member.supervisor_id == viewer._id,
        UserRole::TeamMember => false,
    }
}

/// Whether `viewer` may see the dashboard of `supervisor`'s team.
pub fn can_view_team(viewer: &User, supervisor: &User) -> bool {
    match viewer.role {
        UserRole::Executive => {
            viewer.company_id.is_some() && viewer.company_id == supervisor.company_id
        }
        UserRole::Supervisor => viewer._id.is_some() && viewer._id == supervisor._id,
        UserRole::TeamMember => false,
    }
}

pub fn belongs_to(user: &User, company_id: &mongodb::bson::oid::ObjectId) -> bool {
    user.company_id.as_ref() == Some(company_id)
}
