use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, warn};

use super::review_url;
use crate::auth::Viewer;
use crate::error::AppError;
use crate::messages::{self, Message};
use crate::models::comment::Comment;
use crate::models::review::Review;
use crate::AppState;

pub const COMMENT_DELETED: &str = "Comment deleted successfully";
pub const NO_DELETE_PERMISSION: &str = "You do not have permission to delete this comment";
pub const COMMENT_APPROVED: &str = "Comment approved";

async fn comment_with_review(state: &AppState, id: i64) -> Result<(Comment, Review), AppError> {
    let comment = state.db.get_comment(id).await?.ok_or(AppError::NotFound)?;
    let review = state
        .db
        .get_review(comment.review_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((comment, review))
}

/// Only the comment's author may delete it. Either way the user lands back
/// on the review page.
pub async fn delete_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let (comment, review) = comment_with_review(&state, path.into_inner()).await?;
    let target = review_url(&review.slug);
    // POST-only route: login returns to the review instead.
    let user = viewer.require(&target)?;

    if !comment.is_written_by(user.id, &user.username) {
        warn!("{} may not delete comment {}", user.username, comment.id);
        return Ok(messages::redirect_with(
            &req,
            &target,
            &[Message::error(NO_DELETE_PERMISSION)],
        ));
    }

    state.db.delete_comment(comment.id).await?;
    Ok(messages::redirect_with(
        &req,
        &target,
        &[Message::success(COMMENT_DELETED)],
    ))
}

pub async fn approve_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let (comment, review) = comment_with_review(&state, path.into_inner()).await?;
    let target = review_url(&review.slug);
    let user = viewer.require(&target)?;
    if !user.is_staff {
        return Err(AppError::Forbidden);
    }

    state.db.approve_comment(comment.id).await?;
    info!("{} approved comment {}", user.username, comment.id);
    Ok(messages::redirect_with(
        &req,
        &target,
        &[Message::success(COMMENT_APPROVED)],
    ))
}
