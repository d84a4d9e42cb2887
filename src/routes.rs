use crate::{
    chat::{
        chat_dto::{ChatHistoryResponse, SendChatMessageRequest, SendChatMessageResponse},
        chat_handlers,
        chat_models::{Chat, ChatMessage, ChatMessageResponse, ChatResponse, ListingType, MessageKind},
    },
    middleware::auth_middleware,
    state::AppState,
    websocket::types::{ErrorPayload, RoomMessagePayload, WsMessage},
};
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::chat::chat_handlers::get_history,
        crate::chat::chat_handlers::send_message,
    ),
    components(
        schemas(
            SendChatMessageRequest,
            ChatHistoryResponse,
            SendChatMessageResponse,
            Chat,
            ChatMessage,
            ChatResponse,
            ChatMessageResponse,
            ListingType,
            MessageKind,
            WsMessage,
            RoomMessagePayload,
            ErrorPayload,
        )
    ),
    tags(
        (name = "chat", description = "Per-listing chat endpoints")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
            "http://localhost:5173".parse().unwrap(),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    // History reads are open; an unstarted conversation is valid state and
    // the page shape never reveals more than the durable messages.
    let chat_read_routes = Router::new().route(
        "/:listing_type/:listing_id/:user_id/:owner_id",
        get(chat_handlers::get_history),
    );

    // Sends require an authenticated sender identity.
    let chat_write_routes = Router::new()
        .route(
            "/:listing_type/:listing_id/:user_id/:owner_id",
            post(chat_handlers::send_message),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Realtime relay
    let ws_routes = Router::new()
        .route("/ws", get(crate::websocket::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let chat_routes = chat_read_routes.merge(chat_write_routes).merge(ws_routes);

    let api_routes = Router::new().nest("/chat", chat_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::create_jwt,
        chat::{ChatRepository, ChatService},
        state::Config,
        websocket::RoomManager,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    // A lazily-connected pool never opens a socket for requests that are
    // rejected before store access, which is exactly what these tests cover.
    fn test_state() -> AppState {
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/pet_marketplace_test")
            .unwrap();
        let rooms = RoomManager::new();
        let chat_service = ChatService::new(ChatRepository::new(db), rooms.clone());

        AppState {
            config: Arc::new(Config {
                jwt_secret: "test-secret".to_string(),
                jwt_expiration_hours: 1,
            }),
            rooms,
            chat_service,
        }
    }

    fn bearer(state: &AppState) -> String {
        let token = create_jwt(Uuid::new_v4(), &state.config.jwt_secret, 1).unwrap();
        format!("Bearer {}", token)
    }

    fn chat_path(listing_type: &str) -> String {
        format!(
            "/api/chat/{}/p1/{}/{}",
            listing_type,
            Uuid::new_v4(),
            Uuid::new_v4()
        )
    }

    #[tokio::test]
    async fn test_history_rejects_invalid_listing_type() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(chat_path("garage-sale"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_requires_authentication() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(chat_path("adoption"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"content":"hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_send_rejects_invalid_listing_type() {
        let state = test_state();
        let auth = bearer(&state);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(chat_path("garage-sale"))
                    .header("Authorization", auth)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"content":"hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_rejects_missing_content() {
        let state = test_state();
        let auth = bearer(&state);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(chat_path("adoption"))
                    .header("Authorization", auth)
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_rejects_empty_content() {
        let state = test_state();
        let auth = bearer(&state);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(chat_path("marketplace"))
                    .header("Authorization", auth)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"content":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_rejects_zero_page() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("{}?page=0", chat_path("adoption")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
