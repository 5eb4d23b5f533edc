pub mod domain;
pub mod repository;
pub mod service;
pub mod validation;

pub use domain::{Comment, CommentError, CommentId, Like, PostId, UserId};
pub use repository::{CommentRepository, LikeOutcome, RepositoryError, SqliteCommentRepository};
pub use service::{CommentService, ServiceError};
pub use validation::{FieldError, Validate};
