//! JSON access to the registry

use crate::{
    AppState,
    error::Result,
    models::{ApiResponse, GenerateRequest},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use mailtheme::{GeneratedMail, MailError, MailTemplate};
use tracing::{debug, warn};

/// Create registry API routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/themes", get(list_themes))
        .route("/themes/{theme_id}/templates", get(list_templates))
        .route(
            "/themes/{theme_id}/templates/{template_id}/generate",
            post(generate),
        )
}

async fn list_themes(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    let themes = state.client.get_themes().await?;
    Ok(Json(ApiResponse::new(themes)))
}

async fn list_templates(
    State(state): State<AppState>,
    Path(theme_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MailTemplate>>>> {
    debug!("Listing templates of theme {}", theme_id);

    let themes = state.client.get_themes().await?;
    if !themes.contains(&theme_id) {
        return Err(MailError::NoSuchTheme { theme_id }.into());
    }

    let templates = state.client.get_templates(&theme_id).await?;
    Ok(Json(ApiResponse::new(templates)))
}

async fn generate(
    State(state): State<AppState>,
    Path((theme_id, template_id)): Path<(String, String)>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GeneratedMail>>> {
    let lang = request
        .lang
        .unwrap_or_else(|| state.config.preview_lang.clone());

    let mail = state
        .client
        .generate_email(&theme_id, &template_id, &lang, request.meta)
        .await
        .map_err(|e| {
            warn!("Generation of {}/{} failed: {}", theme_id, template_id, e);
            e
        })?;

    Ok(Json(ApiResponse::with_message(
        mail,
        format!("Generated {} in {}", template_id, lang),
    )))
}

#[cfg(test)]
mod tests {
    use crate::{config::ServerConfig, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_themes() {
        let app = test_app(ServerConfig::default()).await;
        let response = app
            .oneshot(Request::get("/api/themes").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], json!(["examples"]));
    }

    #[tokio::test]
    async fn test_list_templates_of_unknown_theme() {
        let app = test_app(ServerConfig::default()).await;
        let response = app
            .oneshot(
                Request::get("/api/themes/nope/templates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NO_THEME");
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_list_templates() {
        let app = test_app(ServerConfig::default()).await;
        let response = app
            .oneshot(
                Request::get("/api/themes/examples/templates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"][0]["id"], "email-verification");
        assert_eq!(body["data"][0]["exampleData"]["otp"], "12345");
        assert_eq!(body["data"][1]["id"], "review-received");
    }

    #[tokio::test]
    async fn test_generate() {
        let app = test_app(ServerConfig::default()).await;
        let response = app
            .oneshot(post_json(
                "/api/themes/examples/templates/review-received/generate",
                json!({ "meta": { "authorName": "Sam", "reviewText": "Lovely stay" } }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["subject"], "Review Received");
        assert_eq!(body["data"]["text"], "Review: Lovely stay - Sam");
        assert_eq!(body["message"], "Generated review-received in en");
    }

    #[tokio::test]
    async fn test_generate_with_invalid_meta() {
        let app = test_app(ServerConfig::default()).await;
        let response = app
            .oneshot(post_json(
                "/api/themes/examples/templates/email-verification/generate",
                json!({ "lang": "en", "meta": { "otp": "12345" } }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_META");
        let paths: Vec<_> = body["issues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|issue| issue["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, vec!["headerColour", "companyName"]);
    }

    #[tokio::test]
    async fn test_generate_without_meta() {
        let app = test_app(ServerConfig::default()).await;
        let response = app
            .oneshot(post_json(
                "/api/themes/examples/templates/email-verification/generate",
                json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "NO_META");
    }
}
