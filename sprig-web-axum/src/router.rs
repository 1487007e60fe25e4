//! Funnels every request into the [Dispatcher]. `GET` and `POST` are handled identically, on any
//! path; routing itself is left to the dispatcher.
//!
//! Request parameters are the query pairs followed by the pairs of a form-encoded `POST` body.

use axum::extract::{Query, State};
use axum::Form;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use sprig::dispatcher::{DispatchOutcome, Dispatcher};
use sprig::http::{BufferedResponse, SimpleRequest};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
struct DispatchState {
    dispatcher: Dispatcher,
    context_path: Arc<str>,
}

/// Maps a dispatch outcome to the response status.
pub fn status_of(outcome: DispatchOutcome) -> StatusCode {
    match outcome {
        DispatchOutcome::Handled => StatusCode::OK,
        DispatchOutcome::NotFound => StatusCode::NOT_FOUND,
        DispatchOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        DispatchOutcome::Dropped => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Creates a [Router] passing all requests to given dispatcher. Requests are seen by the dispatcher
/// with given context path.
pub fn dispatch_router(dispatcher: Dispatcher, context_path: &str) -> Router {
    Router::new().fallback(dispatch).with_state(DispatchState {
        dispatcher,
        context_path: context_path.into(),
    })
}

async fn dispatch(
    State(state): State<DispatchState>,
    method: Method,
    uri: Uri,
    Query(mut parameters): Query<Vec<(String, String)>>,
    form: Option<Form<Vec<(String, String)>>>,
) -> Response {
    if method != Method::GET && method != Method::POST {
        debug!("Rejecting {method} {uri}.");
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    // for GET, the form extractor reads the query again
    if let Some(Form(body)) = form.filter(|_| method == Method::POST) {
        parameters.extend(body);
    }

    let request = SimpleRequest {
        path: uri.path().to_string(),
        context_path: state.context_path.to_string(),
        parameters: parameters.into_iter().collect(),
    };

    // handlers are blocking code
    let result = tokio::task::spawn_blocking(move || {
        let mut response = BufferedResponse::default();
        let outcome = state.dispatcher.handle(&request, &mut response);
        (outcome, response.into_body())
    })
    .await;

    match result {
        Ok((DispatchOutcome::Dropped, _)) => status_of(DispatchOutcome::Dropped).into_response(),
        Ok((outcome, body)) => (status_of(outcome), body).into_response(),
        Err(join_error) => {
            error!("Error running dispatch task for {uri}: {join_error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
