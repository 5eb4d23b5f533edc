use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::comments::validation::{CreateCommentRequest, UpdateCommentRequest};
use crate::comments::{Comment, CommentId, Like, PostId};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, ValidatedJson};
use crate::state::AppState;

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route(
            "/{id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .route("/like/{id}", put(like_comment))
        .route("/unlike/{id}", put(unlike_comment))
}

// --- Handlers ---

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<CreateCommentRequest>,
) -> AppResult<Json<Comment>> {
    let text = body.text.unwrap_or_default();
    let post = PostId::new(body.post.unwrap_or_default());

    let comment = state.comments.create(&user.id, text, post).await?;
    Ok(Json(comment))
}

async fn list_comments(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<Comment>>> {
    Ok(Json(state.comments.list_all().await?))
}

async fn get_comment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Comment>> {
    let comment = state.comments.get_by_id(&CommentId::new(id)).await?;
    Ok(Json(comment))
}

async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateCommentRequest>,
) -> AppResult<Json<Comment>> {
    let text = body.text.unwrap_or_default();

    let comment = state
        .comments
        .update(&user.id, &CommentId::new(id), text)
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.comments.delete(&user.id, &CommentId::new(id)).await?;
    Ok(Json(json!({ "msg": "Comment removed" })))
}

async fn like_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Like>>> {
    let likes = state.comments.like(&user.id, &CommentId::new(id)).await?;
    Ok(Json(likes))
}

async fn unlike_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Like>>> {
    let likes = state.comments.unlike(&user.id, &CommentId::new(id)).await?;
    Ok(Json(likes))
}
