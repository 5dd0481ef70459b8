use actix_web::web;

pub mod bold_action;
pub mod company;
pub mod content;
pub mod dashboard;
pub mod standup;
pub mod training;
pub mod user;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(user::create_user)
        .service(user::get_me)
        .service(user::get_users)
        .service(user::get_user_progress)
        .service(training::get_trainings)
        .service(training::create_training)
        .service(training::reorder_trainings)
        .service(training::update_training)
        .service(training::complete_video)
        .service(training::submit_worksheet)
        .service(bold_action::get_bold_actions)
        .service(bold_action::complete_bold_action)
        .service(standup::get_standups)
        .service(standup::create_standup)
        .service(standup::complete_standup)
        .service(company::create_company)
        .service(company::get_company)
        .service(company::create_invite)
        .service(company::join_by_invite)
        .service(company::join_by_password)
        .service(dashboard::get_team_metrics)
        .service(dashboard::get_company_dashboard)
        .service(dashboard::get_leaderboard)
        .service(content::get_contents)
        .service(content::record_view);
}
