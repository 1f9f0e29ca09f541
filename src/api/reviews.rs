use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{find_review, render, review_url};
use crate::auth::Viewer;
use crate::error::AppError;
use crate::db::ReviewWriteError;
use crate::forms::{CommentForm, FieldErrors, FormData, ReviewForm, Validated};
use crate::messages::{self, Message};
use crate::models::comment::NewComment;
use crate::models::review::{Review, ReviewSort, VoteKind};
use crate::utils::pagination::Paginator;
use crate::AppState;

pub const COMMENT_PENDING: &str = "Comment submitted and awaiting approval";
pub const REVIEW_CREATED: &str = "Review created successfully";
pub const REVIEW_UPDATED: &str = "Review updated successfully";
pub const REVIEW_DELETED: &str = "Review deleted successfully";
pub const NO_EDIT_PERMISSION: &str = "You do not have permission to edit this review";

#[derive(Deserialize, Debug)]
pub struct ListParams {
    pub sort: Option<String>,
    pub page: Option<String>,
}

/// Published reviews, newest first or by net votes with `?sort=total_votes`.
pub async fn list_reviews(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let sort = ReviewSort::from_param(params.sort.as_deref());
    let count = state.db.count_published().await?;
    let paginator = Paginator::new(count, state.config.reviews.page_size);
    let page = paginator.page(params.page.as_deref());
    let reviews = state
        .db
        .list_published(sort, page.limit, page.offset)
        .await?;

    Ok(render(
        &req,
        &[],
        json!({
            "review_list": reviews,
            "current_sort": params.sort.clone().unwrap_or_default(),
            "paginator": paginator,
            "page_obj": page,
            "is_paginated": paginator.num_pages > 1,
        }),
    ))
}

async fn detail_context(
    state: &AppState,
    viewer: &Viewer,
    review: &Review,
    commented: bool,
    form: &CommentForm,
    errors: Option<&FieldErrors>,
) -> Result<Value, AppError> {
    let comments = state.db.approved_comments(review.id).await?;
    let (pending, vote) = match viewer.user() {
        Some(user) => (
            state.db.pending_comments(review.id, user.id).await?,
            state.db.vote_of(review.id, user.id).await?,
        ),
        None => (Vec::new(), None),
    };

    Ok(json!({
        "review": review,
        "comment_count": comments.len(),
        "comments": comments,
        "pending_comments": pending,
        "commented": commented,
        "upvoted": vote == Some(VoteKind::Up),
        "downvoted": vote == Some(VoteKind::Down),
        "comment_form": form,
        "errors": errors,
    }))
}

pub async fn review_detail(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let review = find_review(&state, &path.into_inner()).await?;
    let context =
        detail_context(&state, &viewer, &review, false, &CommentForm::default(), None).await?;
    Ok(render(&req, &[], context))
}

/// New comments are stored unapproved and only shown back to their author.
pub async fn post_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let user = viewer.require(req.path())?;
    let review = find_review(&state, &path.into_inner()).await?;
    let form = CommentForm::from_form(&FormData::parse(&body));

    match form.validate() {
        Ok(clean) => {
            let comment = state
                .db
                .insert_comment(&NewComment {
                    review_id: review.id,
                    author_id: Some(user.id),
                    name: Some(clean.name.unwrap_or_else(|| user.username.clone())),
                    body: clean.body,
                    approved: false,
                    created_on: Utc::now(),
                })
                .await?;
            info!(
                "Comment {} by {} on {} awaiting approval",
                comment.id, user.username, review.slug
            );
            let context =
                detail_context(&state, &viewer, &review, true, &CommentForm::default(), None)
                    .await?;
            Ok(render(&req, &[Message::success(COMMENT_PENDING)], context))
        }
        Err(errors) => {
            let context =
                detail_context(&state, &viewer, &review, false, &form, Some(&errors)).await?;
            Ok(render(&req, &[], context))
        }
    }
}

async fn form_page(
    req: &HttpRequest,
    state: &AppState,
    form: &ReviewForm,
    errors: Option<&FieldErrors>,
    review: Option<&Review>,
) -> Result<HttpResponse, AppError> {
    let ingredients = state.db.list_ingredients().await?;
    let utensils = state.db.list_utensils().await?;
    Ok(render(
        req,
        &[],
        json!({
            "form": form,
            "errors": errors,
            "review": review,
            "ingredients": ingredients,
            "utensils": utensils,
        }),
    ))
}

pub async fn new_review_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    viewer.require(req.path())?;
    form_page(&req, &state, &ReviewForm::default(), None, None).await
}

pub async fn create_review(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let user = viewer.require(req.path())?;
    let form = ReviewForm::from_form(&FormData::parse(&body));

    match form.clean(&state.db, None).await? {
        Validated::Valid(draft) => match state.db.insert_review(user.id, &draft, Utc::now()).await {
            Ok(review) => Ok(messages::redirect_with(
                &req,
                &review_url(&review.slug),
                &[Message::success(REVIEW_CREATED)],
            )),
            Err(ReviewWriteError::SlugTaken(_)) => {
                form_page(&req, &state, &form, Some(&FieldErrors::slug_taken()), None).await
            }
            Err(ReviewWriteError::Database(e)) => Err(e.into()),
        },
        Validated::Invalid(errors) => form_page(&req, &state, &form, Some(&errors), None).await,
    }
}

/// Loads the review and checks the viewer wrote it. A non-author gets the
/// redirect to send back instead.
async fn authored_review(
    req: &HttpRequest,
    state: &AppState,
    viewer: &Viewer,
    slug: &str,
) -> Result<Result<Review, HttpResponse>, AppError> {
    let user = viewer.require(req.path())?;
    let review = find_review(state, slug).await?;
    if review.author_id != user.id {
        warn!("{} tried to edit review {}", user.username, review.slug);
        return Ok(Err(messages::redirect_with(
            req,
            &review_url(&review.slug),
            &[Message::error(NO_EDIT_PERMISSION)],
        )));
    }
    Ok(Ok(review))
}

pub async fn update_review_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let review = match authored_review(&req, &state, &viewer, &path.into_inner()).await? {
        Ok(review) => review,
        Err(denied) => return Ok(denied),
    };
    form_page(&req, &state, &ReviewForm::from_review(&review), None, Some(&review)).await
}

/// Edits the review, or deletes it when the form carries a `delete` field.
pub async fn update_review(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let review = match authored_review(&req, &state, &viewer, &path.into_inner()).await? {
        Ok(review) => review,
        Err(denied) => return Ok(denied),
    };
    let data = FormData::parse(&body);

    if data.contains("delete") {
        state.db.delete_review(review.id).await?;
        return Ok(messages::redirect_with(
            &req,
            "/reviews/",
            &[Message::success(REVIEW_DELETED)],
        ));
    }

    let form = ReviewForm::from_form(&data);
    match form.clean(&state.db, Some(review.id)).await? {
        Validated::Valid(draft) => match state.db.update_review(review.id, &draft).await {
            Ok(updated) => Ok(messages::redirect_with(
                &req,
                &review_url(&updated.slug),
                &[Message::success(REVIEW_UPDATED)],
            )),
            Err(ReviewWriteError::SlugTaken(_)) => {
                let errors = FieldErrors::slug_taken();
                form_page(&req, &state, &form, Some(&errors), Some(&review)).await
            }
            Err(ReviewWriteError::Database(e)) => Err(e.into()),
        },
        Validated::Invalid(errors) => {
            form_page(&req, &state, &form, Some(&errors), Some(&review)).await
        }
    }
}
