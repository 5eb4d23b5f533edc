// Domain types - pure, no I/O. The repository persists them, the service
// orchestrates them.
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// New types for compile-time safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub post: PostId,
    pub user: UserId,
    pub date: DateTime<Utc>,
    pub likes: Vec<Like>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentError {
    NotOwner,
    AlreadyLiked,
    NotLiked,
}

impl fmt::Display for CommentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOwner => write!(f, "User not authorized"),
            Self::AlreadyLiked => write!(f, "Comment already liked"),
            Self::NotLiked => write!(f, "Comment has not yet been liked"),
        }
    }
}

impl std::error::Error for CommentError {}

impl Comment {
    /// Build a fresh comment authored by `user`. The timestamp is truncated to
    /// milliseconds so it survives a round trip through the store unchanged.
    pub fn new(user: UserId, text: impl Into<String>, post: PostId, now: DateTime<Utc>) -> Self {
        Self {
            id: CommentId::generate(),
            text: text.into(),
            post,
            user,
            date: now.trunc_subsecs(3),
            likes: Vec::new(),
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user == *user
    }

    pub fn ensure_owner(&self, user: &UserId) -> Result<(), CommentError> {
        if self.is_owned_by(user) {
            Ok(())
        } else {
            Err(CommentError::NotOwner)
        }
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.likes.iter().any(|like| like.user == *user)
    }

    /// Replace the text. Only the owner may edit.
    pub fn edit(&mut self, editor: &UserId, text: impl Into<String>) -> Result<(), CommentError> {
        self.ensure_owner(editor)?;
        self.text = text.into();
        Ok(())
    }

    /// Prepend a like from `user`.
    pub fn like(&mut self, user: &UserId) -> Result<&[Like], CommentError> {
        if self.is_liked_by(user) {
            return Err(CommentError::AlreadyLiked);
        }
        self.likes.insert(0, Like { user: user.clone() });
        Ok(&self.likes)
    }

    /// Remove the like from `user`, leaving every other entry in place.
    pub fn unlike(&mut self, user: &UserId) -> Result<&[Like], CommentError> {
        let index = self
            .likes
            .iter()
            .position(|like| like.user == *user)
            .ok_or(CommentError::NotLiked)?;
        self.likes.remove(index);
        Ok(&self.likes)
    }
}
