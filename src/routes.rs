// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{MethodRouter, delete, get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    handlers::{admin, auth, battery, health, process, question},
    models::scope::Scope,
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, require_scopes},
};

const QUESTIONS_READ: &[Scope] = &[Scope::QuestionsRead];
const QUESTIONS_WRITE: &[Scope] = &[Scope::QuestionsWrite];
const QUESTIONS_DELETE: &[Scope] = &[Scope::QuestionsDelete];
const PROCESS_CONFIG: &[Scope] = &[Scope::ProcessConfig];

/// Wraps a method router in a scope check.
fn scoped(route: MethodRouter<AppState>, required: &'static [Scope]) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn_with_state(required, require_scopes))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.cors_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Assembles the main application router.
///
/// * Public: banner, health, login/logout.
/// * Authenticated: questions, test flow, batteries, each route gated by
///   the scopes it needs.
/// * Admin: users and roles, gated by the 'administrator' role.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health::index))
        .route("/api/health", get(health::health))
        .route("/api/login", post(auth::login))
        .route("/api/logout", get(auth::logout));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route(
            "/questions",
            scoped(get(question::list_questions), QUESTIONS_READ)
                .merge(scoped(post(question::create_question), QUESTIONS_WRITE)),
        )
        .route(
            "/questions/{id}",
            scoped(get(question::get_question), QUESTIONS_READ)
                .merge(scoped(put(question::update_question), QUESTIONS_WRITE))
                .merge(scoped(delete(question::delete_question), QUESTIONS_DELETE)),
        )
        .route(
            "/process-steps",
            scoped(
                get(process::get_process_steps).put(process::save_process_steps),
                PROCESS_CONFIG,
            ),
        )
        .route(
            "/process-steps/default",
            scoped(get(process::default_process_step), PROCESS_CONFIG),
        )
        .route(
            "/batteries",
            get(battery::list_batteries)
                .merge(scoped(post(battery::create_battery), PROCESS_CONFIG)),
        )
        .route(
            "/batteries/{id}",
            scoped(delete(battery::delete_battery), PROCESS_CONFIG),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/roles", get(admin::list_roles).post(admin::create_role))
        .route("/scopes", get(admin::list_scopes))
        .route(
            "/roles/{id}/permissions/{permission}",
            post(admin::add_role_permission).delete(admin::remove_role_permission),
        )
        // Runs inside the auth layer applied to api_routes below
        .layer(middleware::from_fn(admin_middleware));

    let api_routes = Router::new()
        .merge(protected_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
