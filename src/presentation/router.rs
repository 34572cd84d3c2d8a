// Route table for the canvas API
use crate::presentation::app_state::AppState;
use crate::presentation::handlers;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/events", get(handlers::stream_events))
        .route(
            "/dashboards",
            get(handlers::list_dashboards).post(handlers::create_dashboard),
        )
        .route(
            "/dashboards/selected",
            get(handlers::get_selected).put(handlers::select_dashboard),
        )
        .route(
            "/dashboards/:id",
            get(handlers::get_dashboard).delete(handlers::delete_dashboard),
        )
        .route(
            "/dashboards/:id/zoom",
            get(handlers::get_zoom).put(handlers::set_zoom),
        )
        .route("/dashboards/:id/zoom/in", post(handlers::zoom_in))
        .route("/dashboards/:id/zoom/out", post(handlers::zoom_out))
        .route("/dashboards/:id/edit-mode", put(handlers::set_edit_mode))
        .route("/dashboards/:id/cards", post(handlers::add_card))
        .route(
            "/dashboards/:id/cards/:card_id",
            get(handlers::card_status)
                .patch(handlers::update_card)
                .put(handlers::save_card_edit)
                .delete(handlers::delete_card),
        )
        .route(
            "/dashboards/:id/cards/:card_id/loading",
            get(handlers::stream_card_loading),
        )
        .route("/dashboards/:id/cards/:card_id/clone", post(handlers::clone_card))
        .route("/dashboards/:id/cards/:card_id/focus", post(handlers::focus_card))
        .route("/dashboards/:id/cards/:card_id/drag", post(handlers::begin_drag))
        .route(
            "/dashboards/:id/cards/:card_id/delete-confirm",
            put(handlers::confirm_delete),
        )
        .route("/dashboards/:id/cards/:card_id/resize", put(handlers::resize_card))
        .route("/drag/preview", post(handlers::preview_drag))
        .route("/drag/drop", post(handlers::drop_card))
        .route("/drag", delete(handlers::cancel_drag))
        .route("/generate", post(handlers::generate_card))
        .route("/explore", get(handlers::list_explore_cards))
        .route(
            "/explore/:card_id/transplant",
            post(handlers::transplant_explore_card),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::card_generator::{CardGenerator, Generation};
    use crate::application::dashboard_service::DashboardService;
    use crate::application::dashboard_store::DashboardStore;
    use crate::application::drag_controller::DragController;
    use crate::application::events::EventBus;
    use crate::application::explore_service::ExploreService;
    use crate::application::refresh_scheduler::tests::ScriptedGenerator;
    use crate::application::refresh_scheduler::RefreshScheduler;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(generator: Arc<ScriptedGenerator>) -> Router {
        let generator: Arc<dyn CardGenerator> = generator;
        let store = DashboardStore::new(EventBus::new());
        let scheduler = RefreshScheduler::new(store.clone(), generator.clone());
        let dashboards = DashboardService::new(store.clone(), scheduler, generator);
        let state = Arc::new(AppState {
            drag: DragController::new(store),
            explore: ExploreService::with_seed_catalog(dashboards.clone()),
            dashboards,
        });
        build_router(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn create_dashboard(app: &Router, title: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/dashboards",
            Some(json!({ "title": title, "description": "Ops overview" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn add_card(app: &Router, dashboard_id: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            &format!("/dashboards/{dashboard_id}/cards"),
            Some(json!({
                "html": "<div>v1</div>",
                "conversationHistory": { "prompts": "p1", "html": "<div>v1</div>" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let (status, body) = send(&app, Method::GET, "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn test_create_selects_and_lists() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;

        let (status, list) = send(&app, Method::GET, "/dashboards", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["id"], json!(id));
        assert_eq!(list[0]["isSelected"], json!(true));
        assert_eq!(list[0]["cardCount"], json!(0));

        let (_, selected) = send(&app, Method::GET, "/dashboards/selected", None).await;
        assert_eq!(selected["title"], json!("Metrics"));
        assert_eq!(selected["displayPercent"], json!(100));

        let (status, _) = send(&app, Method::POST, "/dashboards", Some(json!({ "title": "   " }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_dashboard_is_not_found() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let (status, body) = send(&app, Method::GET, "/dashboards/dashboard-missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("dashboard not found"));

        let (status, _) = send(
            &app,
            Method::PUT,
            "/dashboards/selected",
            Some(json!({ "id": "dashboard-missing" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_zoom_steps_and_clamps() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;

        let (_, zoom) = send(&app, Method::POST, &format!("/dashboards/{id}/zoom/out"), None).await;
        assert_eq!(zoom["displayPercent"], json!(90));

        let (_, zoom) = send(
            &app,
            Method::PUT,
            &format!("/dashboards/{id}/zoom"),
            Some(json!({ "zoom": 0.1 })),
        )
        .await;
        assert_eq!(zoom["zoom"], json!(0.5));
        assert_eq!(zoom["displayPercent"], json!(10));

        let (_, zoom) = send(
            &app,
            Method::PUT,
            &format!("/dashboards/{id}/zoom"),
            Some(json!({ "zoom": 0.73 })),
        )
        .await;
        assert_eq!(zoom["displayPercent"], json!(50));

        let (_, zoom) = send(&app, Method::POST, &format!("/dashboards/{id}/zoom/in"), None).await;
        assert_eq!(zoom["displayPercent"], json!(60));
    }

    #[tokio::test]
    async fn test_drag_requires_edit_mode_then_moves_card() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;
        let card_id = add_card(&app, &id).await;
        let card_uri = format!("/dashboards/{id}/cards/{card_id}");

        let (status, _) = send(&app, Method::POST, &format!("{card_uri}/drag"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        send(
            &app,
            Method::PUT,
            &format!("/dashboards/{id}/edit-mode"),
            Some(json!({ "enabled": true })),
        )
        .await;

        send(
            &app,
            Method::PUT,
            &format!("{card_uri}/delete-confirm"),
            Some(json!({ "confirming": true })),
        )
        .await;
        let (_, confirming) = send(&app, Method::GET, &card_uri, None).await;
        assert_eq!(confirming["isConfirmingDelete"], json!(true));
        let (status, _) = send(&app, Method::POST, &format!("{card_uri}/drag"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        send(
            &app,
            Method::PUT,
            &format!("{card_uri}/delete-confirm"),
            Some(json!({ "confirming": false })),
        )
        .await;

        let (status, session) = send(&app, Method::POST, &format!("{card_uri}/drag"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["origin"], json!({ "x": 50.0, "y": 50.0 }));

        let (_, status_view) = send(&app, Method::GET, &card_uri, None).await;
        assert_eq!(status_view["stackingOrder"], json!(1000));

        let (status, moved) = send(
            &app,
            Method::POST,
            "/drag/drop",
            Some(json!({ "delta": { "dx": 30.0, "dy": 20.0 } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["x"], json!(80.0));
        assert_eq!(moved["y"], json!(70.0));

        let (status, _) = send(&app, Method::POST, "/drag/drop", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_save_edit_replaces_content() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;
        let card_id = add_card(&app, &id).await;

        let (status, card) = send(
            &app,
            Method::PUT,
            &format!("/dashboards/{id}/cards/{card_id}"),
            Some(json!({
                "html": "<div>v2</div>",
                "conversationHistory": { "prompts": "p1\np2", "html": "<div>v1</div>" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(card["html"], json!("<div>v2</div>"));
        assert_eq!(card["conversationHistory"]["html"], json!("<div>v2</div>"));
        assert_eq!(card["conversationHistory"]["prompts"], json!("p1\np2"));
        assert_eq!(card["isLoading"], json!(false));
    }

    #[tokio::test]
    async fn test_generate_maps_outcomes() {
        let app = app(ScriptedGenerator::new(vec![
            Ok(Generation::Refused {
                message: "I specialize in view creation.".to_string(),
            }),
            Err("connection refused".to_string()),
        ]));

        let (status, body) = send(&app, Method::POST, "/generate", Some(json!({ "prompt": "hello" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], json!("refused"));

        let (status, body) = send(&app, Method::POST, "/generate", Some(json!({ "prompt": "chart" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], json!("Failed to generate card"));

        let (status, _) = send(&app, Method::POST, "/generate", Some(json!({ "prompt": " " }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_transplant_explore_card() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;

        let (_, catalog) = send(&app, Method::GET, "/explore", None).await;
        assert_eq!(catalog.as_array().unwrap().len(), 6);

        let (status, card) = send(
            &app,
            Method::POST,
            "/explore/explore-world-clock/transplant",
            Some(json!({ "dashboardId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(card["width"], json!(400.0));
        assert_eq!(card["height"], json!(300.0));

        let (status, _) = send(
            &app,
            Method::POST,
            "/explore/explore-missing/transplant",
            Some(json!({ "dashboardId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_card_loading_stream_ends_with_card() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;
        let card_id = add_card(&app, &id).await;
        let card_uri = format!("/dashboards/{id}/cards/{card_id}");

        let (status, _) = send(&app, Method::GET, &format!("/dashboards/{id}/cards/box-missing/loading"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = Request::builder()
            .uri(format!("{card_uri}/loading"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let (status, _) = send(&app, Method::DELETE, &card_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("event: refresh_state"));
        assert!(text.contains(r#""state":"idle""#));
        assert!(text.contains(r#""isLoading":false"#));
    }

    #[tokio::test]
    async fn test_delete_card_then_dashboard() {
        let app = app(ScriptedGenerator::html("<div/>"));
        let id = create_dashboard(&app, "Metrics").await;
        let card_id = add_card(&app, &id).await;

        let uri = format!("/dashboards/{id}/cards/{card_id}");
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &format!("/dashboards/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, selected) = send(&app, Method::GET, "/dashboards/selected", None).await;
        assert_eq!(selected, Value::Null);
    }
}
