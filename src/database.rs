use mongodb::{bson::oid::ObjectId, options::ClientOptions, Client, Database};
use std::str::FromStr;

use crate::error::{AppError, Result};

pub const USERS: &str = "users";
pub const COMPANIES: &str = "companies";
pub const INVITES: &str = "invites";
pub const TRAININGS: &str = "trainings";
pub const TRAINING_PROGRESS: &str = "training-progress";
pub const WORKSHEETS: &str = "worksheets";
pub const BOLD_ACTIONS: &str = "bold-actions";
pub const STANDUPS: &str = "standups";

pub async fn connect(uri: &str, name: &str) -> Result<Database> {
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some("brilliant-os-server".to_string());

    let client = Client::with_options(options)?;
    tracing::info!(database = name, "connected to document store");
    Ok(client.database(name))
}

pub fn parse_id(raw: &str) -> Result<ObjectId> {
    ObjectId::from_str(raw).map_err(|_| AppError::validation("INVALID_ID"))
}
