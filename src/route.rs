use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    error::expose_error_details,
    handler::*,
    jwt_auth::auth,
    subscription::note_quota,
    webhook::clerk_webhook_handler,
    AppState,
};

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("CORS_ORIGIN {origin:?} is not a valid header value, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let options = app_state.options.clone();

    let mut router: Router<Arc<AppState>> = Router::new()
        .route("/api/notes", get(get_notes_handler))
        .route(
            "/api/notes",
            post(create_note_handler)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), note_quota)),
        )
        .route(
            "/api/notes/:id",
            get(get_note_handler)
                .put(update_note_handler)
                .delete(delete_note_handler),
        );

    if options.admin_routes {
        router = router
            .route("/api/admin/check-subscription", get(check_subscription_handler))
            .route("/api/admin/update-subscription", post(update_subscription_handler))
            .route("/api/admin/cancel-subscription", post(cancel_subscription_handler));
    }

    // routes added after this layer are public
    let mut router = router
        .route_layer(middleware::from_fn_with_state(app_state.clone(), auth))
        .route("/", get(health_handler))
        .route("/api/webhooks/clerk", post(clerk_webhook_handler))
        .fallback(fallback_handler);

    if options.development {
        router = router.layer(middleware::from_fn(expose_error_details));
    }

    router
        .layer(cors_layer(&options.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
