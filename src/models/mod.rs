pub mod bold_action;
pub mod company;
pub mod invite;
pub mod role;
pub mod standup;
pub mod training;
pub mod training_progress;
pub mod user;
pub mod worksheet;
