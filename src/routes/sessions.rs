use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::response::{ok, AppError};
use crate::services::rating::{record_rating, RatingTag};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(delete_session))
        .route("/:id/answers", post(submit_answer))
        .route("/:id/next", post(next_round))
        .route("/:id/reset", post(reset_session))
        .route("/:id/rounds/:round/rating", post(rate_round))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionBody {
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerBody {
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingBody {
    rating: RatingTag,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RatingAck {
    session_id: Uuid,
    round: usize,
    rating: RatingTag,
}

pub(crate) fn resolve_lang(state: &AppState, requested: Option<&str>) -> Result<String, AppError> {
    let lang = requested
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(state.default_lang())
        .trim()
        .to_ascii_lowercase();

    if !state.pipeline().languages().supports(&lang) {
        return Err(AppError::validation(format!("unsupported language '{lang}'")));
    }
    Ok(lang)
}

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionBody>>,
) -> Result<Response, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let lang = resolve_lang(&state, body.lang.as_deref())?;
    let view = state.sessions().create(&lang);
    Ok((StatusCode::CREATED, ok(view)).into_response())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let view = state.sessions().view(id)?;
    Ok(ok(view).into_response())
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.sessions().remove(id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnswerBody>,
) -> Result<Response, AppError> {
    let view = state
        .sessions()
        .submit_answer(id, &body.answer, state.pipeline())
        .await?;
    Ok(ok(view).into_response())
}

async fn next_round(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let view = state.sessions().advance(id)?;
    Ok(ok(view).into_response())
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let view = state.sessions().reset(id)?;
    Ok(ok(view).into_response())
}

async fn rate_round(
    State(state): State<AppState>,
    Path((id, round)): Path<(Uuid, usize)>,
    Json(body): Json<RatingBody>,
) -> Result<Response, AppError> {
    let handle = state.sessions().get(id)?;
    let record = handle.lock().round(round)?.clone();
    record_rating(id, round, &record, body.rating);

    let ack = RatingAck {
        session_id: id,
        round,
        rating: body.rating,
    };
    Ok((StatusCode::ACCEPTED, ok(ack)).into_response())
}
