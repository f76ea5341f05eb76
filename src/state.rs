use std::sync::Arc;

use crate::{config::AppConfig, store::JsonStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub config: AppConfig,
}
