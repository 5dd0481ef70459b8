use mongodb::Database;
use std::sync::Arc;

use crate::{
    auth::TokenVerifier,
    config::Settings,
    events::EventBus,
    progress::source::{ProgressSource, UserDirectory},
    tribe::TribeClient,
};

/// Shared handles passed to every handler through `web::Data`.
pub struct AppState {
    pub db: Database,
    pub source: Arc<dyn ProgressSource>,
    pub users: Arc<dyn UserDirectory>,
    pub tribe: TribeClient,
    pub events: EventBus,
    pub verifier: TokenVerifier,
    pub settings: Settings,
}
