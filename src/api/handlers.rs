use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;

use crate::controller::{SEARCH_EXAMPLES, SearchOutcome};
use crate::data_models::Identity;
use crate::error::SessionError;
use crate::synthesizer::GenerativeBackend;

use super::AppState;
use super::models::{
    ExamplesResponse, SearchRequest, SearchResponse, SearchStatus, SignInRequest, StateResponse,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub async fn search_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    let start = Instant::now();

    if request.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query cannot be empty".to_string()));
    }

    let outcome = state.controller.submit(&request.query).await;

    let (status, result, upsell, error) = match outcome {
        SearchOutcome::Completed(result) => (SearchStatus::Completed, Some(result), None, None),
        SearchOutcome::Blocked(prompt) => (SearchStatus::Blocked, None, Some(prompt), None),
        SearchOutcome::Failed(message) => (SearchStatus::Failed, None, None, Some(message)),
        SearchOutcome::Busy => (SearchStatus::Busy, None, None, None),
        SearchOutcome::Ignored => (SearchStatus::Ignored, None, None, None),
    };

    let view = state.controller.view();

    Ok(Json(SearchResponse {
        status,
        result,
        upsell,
        error,
        free_searches_used: view.free_searches_used,
        searches_left: view.searches_left,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}

pub async fn state_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> ApiResult<StateResponse> {
    Ok(Json(current_state(&state)))
}

pub async fn examples_handler() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: SEARCH_EXAMPLES,
    })
}

pub async fn sign_in_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<Identity> {
    match state.controller.session().sign_in(&request.credential) {
        Ok(identity) => Ok(Json(identity)),
        Err(e) => {
            log::error!("sign-in ignored: {e}");
            Err(session_error(e))
        }
    }
}

pub async fn sign_out_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> ApiResult<StateResponse> {
    state
        .controller
        .session()
        .sign_out()
        .map_err(session_error)?;
    Ok(Json(current_state(&state)))
}

pub async fn subscribe_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> ApiResult<StateResponse> {
    state.controller.accept_upsell().map_err(session_error)?;
    Ok(Json(current_state(&state)))
}

pub async fn dismiss_upsell_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> ApiResult<StateResponse> {
    state.controller.dismiss_upsell();
    Ok(Json(current_state(&state)))
}

pub async fn home_handler<B: GenerativeBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> ApiResult<StateResponse> {
    state.controller.go_home();
    Ok(Json(current_state(&state)))
}

fn current_state<B: GenerativeBackend>(state: &AppState<B>) -> StateResponse {
    StateResponse {
        identity: state.controller.session().current_identity(),
        view: state.controller.view(),
        limit: state.controller.limit(),
        sign_in_enabled: state.sign_in_enabled,
        google_client_id: state.google_client_id.clone(),
    }
}

fn session_error(e: SessionError) -> (StatusCode, String) {
    let status = match e {
        SessionError::InvalidCredential(_) => StatusCode::BAD_REQUEST,
        SessionError::NotSignedIn => StatusCode::CONFLICT,
        SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}
