// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{answer_option, audit_log, auth, professor_subject, question, subject, user},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * `/auth` is public; every other resource requires a bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, mailer).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/", get(user::list_users).post(user::create_user))
        .route(
            "/{id}",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        .route("/{id}/senha", put(user::change_password));

    let subject_routes = Router::new()
        .route("/", get(subject::list_subjects).post(subject::create_subject))
        .route(
            "/{id}",
            get(subject::get_subject)
                .put(subject::update_subject)
                .delete(subject::delete_subject),
        );

    let question_routes = Router::new()
        .route("/", get(question::browse_questions).post(question::create_question))
        .route("/stats", get(question::stats))
        .route("/stats/personal/{id}", get(question::personal_stats))
        .route("/criador/{id}", get(question::list_by_creator))
        .route("/disciplina/{id}", get(question::list_by_subject))
        .route(
            "/{id}",
            get(question::get_question)
                .put(question::update_question)
                .delete(question::delete_question),
        );

    let option_routes = Router::new()
        .route("/", get(answer_option::list_options).post(answer_option::create_option))
        .route("/questao/{id}", get(answer_option::list_by_question))
        .route(
            "/{id}",
            get(answer_option::get_option)
                .put(answer_option::update_option)
                .delete(answer_option::delete_option),
        );

    let link_routes = Router::new()
        .route(
            "/",
            get(professor_subject::list_links).post(professor_subject::create_link),
        )
        .route("/professor/{id}", get(professor_subject::list_by_professor))
        .route(
            "/{professor_id}/{subject_id}",
            axum::routing::delete(professor_subject::delete_link),
        );

    let log_routes = Router::new()
        .route("/", get(audit_log::list_logs))
        .route("/{id}", get(audit_log::get_log).delete(audit_log::delete_log));

    let protected_routes = Router::new()
        .nest("/usuarios", user_routes)
        .nest("/disciplina", subject_routes)
        .nest("/questao", question_routes)
        .nest("/opcaoresposta", option_routes)
        .nest("/professordisciplina", link_routes)
        .nest("/logcadastro", log_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
