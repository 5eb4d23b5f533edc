use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::sync::Arc;

use crate::comments::{CommentService, SqliteCommentRepository};
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub comments: CommentService,
}

impl AppState {
    /// Wire the SQLite-backed comment store onto `db`.
    pub fn new(db: DbPool, config: Config) -> Self {
        let repo = SqliteCommentRepository::new(db.clone());
        Self {
            db,
            config,
            comments: CommentService::new(Arc::new(repo)),
        }
    }
}
