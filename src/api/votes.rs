use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{debug, warn};

use super::{find_review, review_url};
use crate::auth::Viewer;
use crate::error::AppError;
use crate::forms::FormData;
use crate::messages::{self, Message};
use crate::models::review::VoteKind;
use crate::AppState;

pub const UNKNOWN_VOTE: &str = "Unknown vote type";

/// Upvote or downvote a review, then go back to it. An unrecognised
/// `vote_type` changes nothing.
pub async fn vote(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let user = viewer.require(&review_url(&slug))?;
    let review = find_review(&state, &slug).await?;
    let target = review_url(&review.slug);

    let raw = FormData::parse(&body).get_or_empty("vote_type");
    let kind: VoteKind = match raw.parse() {
        Ok(kind) => kind,
        Err(e) => {
            warn!("{} sent a bad vote on {}: {}", user.username, review.slug, e);
            return Ok(messages::redirect_with(
                &req,
                &target,
                &[Message::error(UNKNOWN_VOTE)],
            ));
        }
    };

    let held = state.db.apply_vote(review.id, user.id, kind).await?;
    debug!("{} now holds {:?} on {}", user.username, held, review.slug);
    Ok(messages::redirect(&target))
}
