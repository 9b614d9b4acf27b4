use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use recipebox_core::error::{CatalogError, catalog_error};
use recipebox_core::models::{
    ExportTable, Meal, Recipe, RecipeFilter, RecipeForm, RecipeOverview,
};
use recipebox_core::service::CatalogService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<CatalogService>>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, CatalogService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct LogMealRequest {
    ate_on: String,
    #[serde(default)]
    notes: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let mapped = match catalog_error(&err) {
            Some(e @ CatalogError::RecipeNotFound(_)) => Some(Self::NotFound(e.to_string())),
            Some(e @ (CatalogError::EmptyName | CatalogError::UnknownTable(_))) => {
                Some(Self::BadRequest(e.to_string()))
            }
            None => None,
        };
        mapped.unwrap_or_else(|| Self::Internal(err))
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Recipe handlers ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(filter): Query<RecipeFilter>,
) -> Result<Json<Vec<RecipeOverview>>, ApiError> {
    let recipes = state.svc().list_recipes(&filter)?;
    Ok(Json(recipes))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(form): Json<RecipeForm>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state.svc().save_recipe(&form)?;
    info!(id = recipe.id, name = %recipe.name, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeOverview>, ApiError> {
    let overview = state.svc().recipe_overview(id)?;
    Ok(Json(overview))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<RecipeForm>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = state.svc().edit_recipe(id, &form)?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_recipe(id)?;
    info!(id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- Meal handlers ---

async fn list_meals(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Meal>>, ApiError> {
    let meals = state.svc().meal_history(id)?;
    Ok(Json(meals))
}

async fn log_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<LogMealRequest>,
) -> Result<(StatusCode, Json<Meal>), ApiError> {
    let ate_on = NaiveDate::parse_from_str(&req.ate_on, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!("Invalid date '{}'. Use YYYY-MM-DD", req.ate_on))
    })?;
    let meal = state.svc().log_meal(id, ate_on, &req.notes)?;
    Ok((StatusCode::CREATED, Json(meal)))
}

// --- Suggestion handlers ---

async fn list_likers(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let likers = state.svc().likers()?;
    Ok(Json(likers))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let tags = state.svc().tags()?;
    Ok(Json(tags))
}

// --- Export handler ---

async fn export_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Response, ApiError> {
    let table: ExportTable = table
        .parse()
        .map_err(|e: CatalogError| ApiError::BadRequest(e.to_string()))?;

    let mut body = Vec::new();
    state.svc().export_csv(table, &mut body)?;

    let disposition = format!("attachment; filename=\"{}\"", table.file_name());
    let disposition =
        HeaderValue::from_str(&disposition).context("invalid content-disposition header")?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/recipes/{id}/meals", get(list_meals).post(log_meal))
        .route("/api/likers", get(list_likers))
        .route("/api/tags", get(list_tags))
        .route("/api/export/{table}", get(export_table))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(svc: CatalogService, port: u16, bind: &str) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
    };

    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        eprintln!(
            "Warning: Listening on {bind} without authentication. Any device on your network can change your recipes."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(%bind, port, "server started");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let state = AppState {
            svc: Arc::new(Mutex::new(CatalogService::open_in_memory().unwrap())),
        };
        (build_router(state.clone()), state)
    }

    fn form(name: &str) -> RecipeForm {
        RecipeForm {
            name: name.to_string(),
            ..RecipeForm::default()
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, value: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn create_recipe_returns_201() {
        let (app, _) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/recipes",
                &serde_json::json!({
                    "name": "  Pasta Pesto ",
                    "ingredients": "pasta\npesto",
                    "selected_likers": ["Ana"],
                    "new_likers": "ana, Bob"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["name"], "Pasta Pesto");
        assert_eq!(json["liked_by"], "Ana, Bob");
    }

    #[tokio::test]
    async fn create_recipe_blank_name_returns_400() {
        let (app, state) = test_app();
        let response = app
            .oneshot(post_json("/api/recipes", &serde_json::json!({ "name": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Recipe name is required");
        assert!(
            state
                .svc()
                .list_recipes(&RecipeFilter::default())
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn list_recipes_applies_filters() {
        let (app, state) = test_app();
        {
            let svc = state.svc();
            svc.save_recipe(&RecipeForm {
                ingredients: "spaghetti".to_string(),
                new_likers: "Daughter".to_string(),
                ..form("Bolognese")
            })
            .unwrap();
            svc.save_recipe(&form("apple pie")).unwrap();
            svc.save_recipe(&RecipeForm {
                tags: "spaghetti".to_string(),
                ..form("Aglio olio")
            })
            .unwrap();
        }

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::get("/api/recipes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Aglio olio", "apple pie", "Bolognese"]);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/recipes?q=spag&liked_by=daughter")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Bolognese");
        assert_eq!(json[0]["times_eaten"], 0);
    }

    #[tokio::test]
    async fn get_missing_recipe_returns_404() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                axum::http::Request::get("/api/recipes/99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Recipe 99 not found");
    }

    #[tokio::test]
    async fn update_recipe_replaces_fields() {
        let (app, state) = test_app();
        let id = state
            .svc()
            .save_recipe(&RecipeForm {
                tags: "old".to_string(),
                ..form("Draft")
            })
            .unwrap()
            .id;

        let response = app
            .oneshot(
                axum::http::Request::put(format!("/api/recipes/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Final"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let recipe = state.svc().get_recipe(id).unwrap();
        assert_eq!(recipe.name, "Final");
        assert_eq!(recipe.tags, "");
    }

    #[tokio::test]
    async fn update_missing_recipe_returns_404() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                axum::http::Request::put("/api/recipes/5")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Nope"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn log_meal_and_read_stats() {
        let (app, state) = test_app();
        let id = state.svc().save_recipe(&form("Ramen")).unwrap().id;

        for day in ["2024-01-01", "2024-03-05"] {
            let response = app
                .clone()
                .oneshot(post_json(
                    &format!("/api/recipes/{id}/meals"),
                    &serde_json::json!({ "ate_on": day }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(
                axum::http::Request::get(format!("/api/recipes/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["times_eaten"], 2);
        assert_eq!(json["last_eaten"], "2024-03-05");
    }

    #[tokio::test]
    async fn log_meal_bad_date_returns_400() {
        let (app, state) = test_app();
        let id = state.svc().save_recipe(&form("Ramen")).unwrap().id;
        let response = app
            .oneshot(post_json(
                &format!("/api/recipes/{id}/meals"),
                &serde_json::json!({ "ate_on": "yesterday-ish" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn log_meal_unknown_recipe_returns_404() {
        let (app, _) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/recipes/77/meals",
                &serde_json::json!({ "ate_on": "2024-01-01" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_recipe_returns_204_then_404() {
        let (app, state) = test_app();
        let id = state.svc().save_recipe(&form("Gone soon")).unwrap().id;

        let request = || {
            axum::http::Request::delete(format!("/api/recipes/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn likers_endpoint() {
        let (app, state) = test_app();
        state
            .svc()
            .save_recipe(&RecipeForm {
                new_likers: "Zoe, ana".to_string(),
                ..form("Crepes")
            })
            .unwrap();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/likers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!(["ana", "Zoe"]));
    }

    #[tokio::test]
    async fn export_returns_csv_attachment() {
        let (app, state) = test_app();
        state.svc().save_recipe(&form("Stamppot")).unwrap();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/export/recipes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"recipes.csv\""
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "id,name,ingredients,instructions,tags,liked_by\n1,Stamppot,,,,\n"
        );
    }

    #[tokio::test]
    async fn export_unknown_table_returns_400() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                axum::http::Request::get("/api/export/sqlite_master")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                axum::http::Request::get("/api/tags")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let (app, _) = test_app();
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/recipes")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::from(anyhow::anyhow!("disk I/O error at /home/user/recipes.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }
}
