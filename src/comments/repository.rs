// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use thiserror::Error;

use crate::comments::domain::{Comment, CommentError, CommentId, Like, PostId, UserId};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Corrupt timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },
}

/// Result of adding or removing a single like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The change was committed. Holds the likes as stored afterwards, newest first.
    Applied(Vec<Like>),
    /// No comment with that id.
    Missing,
    /// The change broke a like rule and nothing was written.
    Rejected(CommentError),
}

/// Durable comment collection keyed by comment id.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: &Comment) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &CommentId) -> Result<Option<Comment>, RepositoryError>;

    /// All comments, newest first.
    async fn find_all(&self) -> Result<Vec<Comment>, RepositoryError>;

    /// Persist the text. Likes are untouched. Returns false if the comment no
    /// longer exists.
    async fn update(&self, comment: &Comment) -> Result<bool, RepositoryError>;

    /// Record a like from `user` in one atomic step.
    async fn add_like(&self, id: &CommentId, user: &UserId)
        -> Result<LikeOutcome, RepositoryError>;

    /// Drop the like from `user` in one atomic step.
    async fn remove_like(
        &self,
        id: &CommentId,
        user: &UserId,
    ) -> Result<LikeOutcome, RepositoryError>;

    /// Hard delete. Returns false if nothing was removed.
    async fn delete(&self, id: &CommentId) -> Result<bool, RepositoryError>;
}

/// SQLite implementation
#[derive(Clone)]
pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|source| RepositoryError::Timestamp { value, source })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn load_likes(conn: &Connection, id: &str) -> Result<Vec<Like>, RepositoryError> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM comment_likes WHERE comment_id = ?1 ORDER BY seq DESC")?;
    let likes = stmt
        .query_map(params![id], |row| {
            Ok(Like {
                user: UserId(row.get(0)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(likes)
}

type CommentRow = (String, String, String, String, String);

fn hydrate(conn: &Connection, row: CommentRow) -> Result<Comment, RepositoryError> {
    let (id, text, post, user, date) = row;
    let likes = load_likes(conn, &id)?;
    Ok(Comment {
        id: CommentId(id),
        text,
        post: PostId(post),
        user: UserId(user),
        date: parse_date(date)?,
        likes,
    })
}

fn load_comment(conn: &Connection, id: &CommentId) -> Result<Option<Comment>, RepositoryError> {
    let row: Option<CommentRow> = conn
        .query_row(
            "SELECT id, text, post_id, user_id, date FROM comments WHERE id = ?1",
            params![id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()?;

    row.map(|row| hydrate(conn, row)).transpose()
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn insert(&self, comment: &Comment) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO comments (id, text, post_id, user_id, date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id.as_str(),
                comment.text,
                comment.post.as_str(),
                comment.user.as_str(),
                format_date(&comment.date)
            ],
        )?;
        {
            // Oldest first, so that reading back by `seq DESC` restores the order.
            let mut stmt =
                tx.prepare("INSERT INTO comment_likes (comment_id, user_id) VALUES (?1, ?2)")?;
            for like in comment.likes.iter().rev() {
                stmt.execute(params![comment.id.as_str(), like.user.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn find_by_id(&self, id: &CommentId) -> Result<Option<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        load_comment(&conn, id)
    }

    async fn find_all(&self) -> Result<Vec<Comment>, RepositoryError> {
        let conn = self.pool.get()?;

        let rows: Vec<CommentRow> = {
            let mut stmt = conn.prepare(
                "SELECT id, text, post_id, user_id, date FROM comments ORDER BY date DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(|row| hydrate(&conn, row)).collect()
    }

    async fn update(&self, comment: &Comment) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;

        // `user`, `post` and `date` are fixed at creation.
        let rows = conn.execute(
            "UPDATE comments SET text = ?2 WHERE id = ?1",
            params![comment.id.as_str(), comment.text],
        )?;

        Ok(rows > 0)
    }

    async fn add_like(
        &self,
        id: &CommentId,
        user: &UserId,
    ) -> Result<LikeOutcome, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut comment) = load_comment(&tx, id)? else {
            return Ok(LikeOutcome::Missing);
        };
        if let Err(rule) = comment.like(user) {
            return Ok(LikeOutcome::Rejected(rule));
        }

        match tx.execute(
            "INSERT INTO comment_likes (comment_id, user_id) VALUES (?1, ?2)",
            params![id.as_str(), user.as_str()],
        ) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Ok(LikeOutcome::Rejected(CommentError::AlreadyLiked));
            }
            Err(e) => return Err(e.into()),
        }

        let likes = load_likes(&tx, id.as_str())?;
        tx.commit()?;
        Ok(LikeOutcome::Applied(likes))
    }

    async fn remove_like(
        &self,
        id: &CommentId,
        user: &UserId,
    ) -> Result<LikeOutcome, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut comment) = load_comment(&tx, id)? else {
            return Ok(LikeOutcome::Missing);
        };
        if let Err(rule) = comment.unlike(user) {
            return Ok(LikeOutcome::Rejected(rule));
        }

        let rows = tx.execute(
            "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
            params![id.as_str(), user.as_str()],
        )?;
        if rows == 0 {
            return Ok(LikeOutcome::Rejected(CommentError::NotLiked));
        }

        let likes = load_likes(&tx, id.as_str())?;
        tx.commit()?;
        Ok(LikeOutcome::Applied(likes))
    }

    async fn delete(&self, id: &CommentId) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id.as_str()])?;

        Ok(rows > 0)
    }
}
