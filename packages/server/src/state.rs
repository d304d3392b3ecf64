use std::sync::Arc;

use common::storage::MediaStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::page::Page;
use crate::utils::cache::PageCache;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub media: Arc<dyn MediaStore>,
    /// Rendered index pages, see `handlers::posts::index`.
    pub page_cache: Arc<PageCache<Page>>,
}
