pub mod comments;

use axum::Router;

use crate::config::Config;
use crate::state::AppState;

/// All API routes, nested under the configured mount path.
pub fn router(config: &Config) -> Router<AppState> {
    let mount = config.mount_prefix();
    if mount.is_empty() {
        // axum refuses to nest at the root
        Router::new().merge(comments::router())
    } else {
        Router::new().nest(mount, comments::router())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app_mounted_at(mount_path: &str) -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = db::create_pool(&temp_dir.path().join("test.db"), 2).unwrap();
        db::run_migrations(&pool).unwrap();

        let mut config = Config::default();
        config.server.mount_path = mount_path.to_string();
        let state = AppState::new(pool, config.clone());
        (router(&config).with_state(state), temp_dir)
    }

    async fn status_of(app: &Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    // A known route without a token answers 401; an unknown one answers 404.
    #[tokio::test]
    async fn custom_mount_path_moves_the_routes() {
        let (app, _temp) = app_mounted_at("/v2/remarks/");

        assert_eq!(status_of(&app, "/v2/remarks").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(&app, "/v2/remarks/abc").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(&app, "/api/comments").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn root_mount_path_serves_from_root() {
        let (app, _temp) = app_mounted_at("/");

        assert_eq!(status_of(&app, "/").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(&app, "/abc").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(&app, "/api/comments").await, StatusCode::NOT_FOUND);
    }
}
