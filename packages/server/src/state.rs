use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::image::ImageService;

#[derive(Clone)]
pub struct AppState {
    pub images: Arc<ImageService>,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
