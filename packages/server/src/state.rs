use std::sync::Arc;

use common::storage::BlobStore;
use mq::Mq;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// `None` when MQ is disabled; intake then accepts submissions without
    /// enqueueing (they stay Pending).
    pub mq: Option<Arc<Mq>>,
    pub storage: Arc<dyn BlobStore>,
}
