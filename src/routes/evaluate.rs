use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::sessions::resolve_lang;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/evaluate", post(evaluate))
        .route("/api/languages", get(languages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateBody {
    task: String,
    answer: String,
    lang: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguagesResponse {
    languages: Vec<String>,
    default_lang: String,
}

/// One-off scoring outside any session.
async fn evaluate(
    State(state): State<AppState>,
    Json(body): Json<EvaluateBody>,
) -> Result<Response, AppError> {
    let answer = body.answer.trim();
    if answer.is_empty() {
        return Err(AppError::validation("answer is empty"));
    }
    let task = body.task.trim();
    if task.is_empty() {
        return Err(AppError::validation("task is empty"));
    }
    let lang = resolve_lang(&state, body.lang.as_deref())?;

    let evaluation = state.pipeline().evaluate(answer, task, &lang).await;
    Ok(ok(evaluation).into_response())
}

async fn languages(State(state): State<AppState>) -> Response {
    let pipeline = state.pipeline();
    let response = LanguagesResponse {
        languages: pipeline
            .languages()
            .codes()
            .into_iter()
            .map(str::to_string)
            .collect(),
        default_lang: state.default_lang().to_string(),
    };
    ok(response).into_response()
}
