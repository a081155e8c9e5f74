//! Route table and the HTTP middleware stack.

use std::any::Any;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use devgate_core::repository::AccountRepository;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{auth, developers, health};
use crate::middleware::{AdminLayer, AuthLayer};
use crate::state::AppState;

/// Build the full router.
///
/// Everything except `/health` and the three credential endpoints sits
/// behind [`AuthLayer`]. Status changes and purges additionally need
/// the operator key checked by [`AdminLayer`].
pub fn router<R: AccountRepository + 'static>(state: AppState<R>) -> Router {
    let session = AuthLayer::new(state.service.tokens().clone());
    let operator = AdminLayer::new(state.config.admin_key.as_deref());
    let config = state.config.clone();

    let operator_routes = Router::new()
        .route("/developers/{id}/purge", delete(developers::hard_delete::<R>))
        .route("/developers/{id}/suspend", post(developers::suspend::<R>))
        .route(
            "/developers/{id}/reactivate",
            post(developers::reactivate::<R>),
        )
        .route("/developers/{id}/verify", post(developers::verify_email::<R>))
        .route_layer(operator);

    let protected = Router::new()
        .route("/auth/profile", get(auth::profile::<R>))
        .route("/developers", get(developers::list::<R>))
        .route(
            "/developers/{id}",
            get(developers::get::<R>)
                .put(developers::update_profile::<R>)
                .delete(developers::soft_delete::<R>),
        )
        .route(
            "/developers/{id}/password",
            put(developers::change_password::<R>),
        )
        .route(
            "/developers/{id}/metadata",
            post(developers::merge_metadata::<R>),
        )
        .merge(operator_routes)
        .route_layer(session);

    let routes = Router::new()
        .route("/health", get(health::health::<R>))
        .route("/auth/register", post(auth::register::<R>))
        .route("/auth/login", post(auth::login::<R>))
        .route("/auth/refresh", post(auth::refresh::<R>))
        .merge(protected)
        .with_state(state);

    with_http_layers(routes, &config)
}

/// Request tracing, panic containment and the whole-request deadline.
fn with_http_layers(routes: Router, config: &ApiConfig) -> Router {
    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            )),
    )
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal {
        message: "request handler panicked".into(),
    }
    .into_response()
}
