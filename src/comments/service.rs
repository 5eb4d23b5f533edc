use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use crate::comments::domain::{Comment, CommentError, CommentId, Like, PostId, UserId};
use crate::comments::repository::{CommentRepository, LikeOutcome, RepositoryError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Comment not found")]
    NotFound,

    #[error(transparent)]
    Rule(#[from] CommentError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Comment operations on behalf of an already-resolved caller. Edits and
/// deletes check ownership before writing. Likes are one atomic repository
/// call each, so concurrent callers cannot overwrite each other.
#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(
        &self,
        caller: &UserId,
        text: String,
        post: PostId,
    ) -> ServiceResult<Comment> {
        let comment = Comment::new(caller.clone(), text, post, Utc::now());
        self.repo.insert(&comment).await?;

        tracing::info!(comment = %comment.id, user = %caller, "Comment created");
        Ok(comment)
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<Comment>> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn get_by_id(&self, id: &CommentId) -> ServiceResult<Comment> {
        self.repo.find_by_id(id).await?.ok_or(ServiceError::NotFound)
    }

    pub async fn update(
        &self,
        caller: &UserId,
        id: &CommentId,
        text: String,
    ) -> ServiceResult<Comment> {
        let mut comment = self.get_by_id(id).await?;
        comment.edit(caller, text)?;
        self.save(&comment).await?;

        tracing::debug!(comment = %id, user = %caller, "Comment updated");
        Ok(comment)
    }

    pub async fn delete(&self, caller: &UserId, id: &CommentId) -> ServiceResult<()> {
        let comment = self.get_by_id(id).await?;
        comment.ensure_owner(caller)?;

        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound);
        }

        tracing::info!(comment = %id, user = %caller, "Comment removed");
        Ok(())
    }

    pub async fn like(&self, caller: &UserId, id: &CommentId) -> ServiceResult<Vec<Like>> {
        let likes = settle(self.repo.add_like(id, caller).await?)?;

        tracing::debug!(comment = %id, user = %caller, "Comment liked");
        Ok(likes)
    }

    pub async fn unlike(&self, caller: &UserId, id: &CommentId) -> ServiceResult<Vec<Like>> {
        let likes = settle(self.repo.remove_like(id, caller).await?)?;

        tracing::debug!(comment = %id, user = %caller, "Comment unliked");
        Ok(likes)
    }

    // The comment can vanish between load and save if its owner deletes it.
    async fn save(&self, comment: &Comment) -> ServiceResult<()> {
        if self.repo.update(comment).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }
}

fn settle(outcome: LikeOutcome) -> ServiceResult<Vec<Like>> {
    match outcome {
        LikeOutcome::Applied(likes) => Ok(likes),
        LikeOutcome::Missing => Err(ServiceError::NotFound),
        LikeOutcome::Rejected(rule) => Err(rule.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::repository::SqliteCommentRepository;
    use crate::db;
    use tempfile::TempDir;

    fn create_test_service() -> (CommentService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = db::create_pool(&db_path, 4).unwrap();
        db::run_migrations(&pool).unwrap();

        let repo = SqliteCommentRepository::new(pool);
        (CommentService::new(Arc::new(repo)), temp_dir)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_owner() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();

        assert!(!comment.id.as_str().is_empty());
        assert_eq!(comment.user, user("u1"));
        assert!(comment.likes.is_empty());

        let loaded = service.get_by_id(&comment.id).await.unwrap();
        assert_eq!(loaded.text, "hi");
        assert_eq!(loaded.post, PostId::new("p1"));
        assert_eq!(loaded.user, user("u1"));
    }

    #[tokio::test]
    async fn test_list_all_is_non_increasing_in_date() {
        let (service, _temp) = create_test_service();

        for i in 0..5 {
            service
                .create(&user("u1"), format!("comment {}", i), PostId::new("p1"))
                .await
                .unwrap();
        }

        let all = service.list_all().await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (service, _temp) = create_test_service();

        let result = service.get_by_id(&CommentId::new("missing")).await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();

        let result = service.update(&user("u2"), &comment.id, "hacked".into()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Rule(CommentError::NotOwner))
        ));

        let loaded = service.get_by_id(&comment.id).await.unwrap();
        assert_eq!(loaded.text, "hi");
    }

    #[tokio::test]
    async fn test_update_keeps_date_and_likes() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();
        service.like(&user("u2"), &comment.id).await.unwrap();

        let updated = service
            .update(&user("u1"), &comment.id, "bye".into())
            .await
            .unwrap();
        assert_eq!(updated.text, "bye");
        assert_eq!(updated.date, comment.date);
        assert_eq!(updated.likes, vec![Like { user: user("u2") }]);
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_keeps_comment() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();

        let result = service.delete(&user("u2"), &comment.id).await;
        assert!(matches!(
            result,
            Err(ServiceError::Rule(CommentError::NotOwner))
        ));
        assert!(service.get_by_id(&comment.id).await.is_ok());

        service.delete(&user("u1"), &comment.id).await.unwrap();
        assert!(matches!(
            service.get_by_id(&comment.id).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_like_twice_is_rejected() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();

        let likes = service.like(&user("u2"), &comment.id).await.unwrap();
        assert_eq!(likes, vec![Like { user: user("u2") }]);

        let result = service.like(&user("u2"), &comment.id).await;
        assert!(matches!(
            result,
            Err(ServiceError::Rule(CommentError::AlreadyLiked))
        ));

        let loaded = service.get_by_id(&comment.id).await.unwrap();
        assert_eq!(loaded.likes.len(), 1);
    }

    #[tokio::test]
    async fn test_unlike_returns_remaining_likes() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();
        service.like(&user("u2"), &comment.id).await.unwrap();
        service.like(&user("u3"), &comment.id).await.unwrap();

        let likes = service.unlike(&user("u2"), &comment.id).await.unwrap();
        assert_eq!(likes, vec![Like { user: user("u3") }]);

        let result = service.unlike(&user("u2"), &comment.id).await;
        assert!(matches!(
            result,
            Err(ServiceError::Rule(CommentError::NotLiked))
        ));
    }

    #[tokio::test]
    async fn test_like_missing_comment_is_not_found() {
        let (service, _temp) = create_test_service();

        let result = service.like(&user("u2"), &CommentId::new("missing")).await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_likes_from_distinct_users_all_persist() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let service = service.clone();
                let id = comment.id.clone();
                tokio::spawn(async move { service.like(&user(&format!("fan-{}", i)), &id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let loaded = service.get_by_id(&comment.id).await.unwrap();
        assert_eq!(loaded.likes.len(), 32);
        for i in 0..32 {
            assert!(loaded.is_liked_by(&user(&format!("fan-{}", i))));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_likes_from_one_user_admit_exactly_one() {
        let (service, _temp) = create_test_service();

        for round in 0..10 {
            let comment = service
                .create(&user("u1"), format!("round {}", round), PostId::new("p1"))
                .await
                .unwrap();

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let service = service.clone();
                    let id = comment.id.clone();
                    tokio::spawn(async move { service.like(&user("u2"), &id).await })
                })
                .collect();

            let mut accepted = 0;
            let mut rejected = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => accepted += 1,
                    Err(ServiceError::Rule(CommentError::AlreadyLiked)) => rejected += 1,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            assert_eq!((accepted, rejected), (1, 1));

            let loaded = service.get_by_id(&comment.id).await.unwrap();
            assert_eq!(loaded.likes, vec![Like { user: user("u2") }]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unlikes_leave_no_likes_behind() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();
        for i in 0..8 {
            service
                .like(&user(&format!("fan-{}", i)), &comment.id)
                .await
                .unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let id = comment.id.clone();
                tokio::spawn(async move { service.unlike(&user(&format!("fan-{}", i)), &id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let loaded = service.get_by_id(&comment.id).await.unwrap();
        assert!(loaded.likes.is_empty());
    }

    #[tokio::test]
    async fn test_edit_does_not_drop_likes_added_meanwhile() {
        let (service, _temp) = create_test_service();

        let comment = service
            .create(&user("u1"), "hi".into(), PostId::new("p1"))
            .await
            .unwrap();
        service.like(&user("u2"), &comment.id).await.unwrap();
        service
            .update(&user("u1"), &comment.id, "bye".into())
            .await
            .unwrap();
        service.like(&user("u3"), &comment.id).await.unwrap();

        let loaded = service.get_by_id(&comment.id).await.unwrap();
        assert_eq!(loaded.text, "bye");
        assert_eq!(
            loaded.likes,
            vec![Like { user: user("u3") }, Like { user: user("u2") }]
        );
    }
}
