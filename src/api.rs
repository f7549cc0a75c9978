//! Review analysis API endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::db;
use crate::keypoints::KeyPointExtractor;
use crate::pipeline::SentimentPipeline;

pub struct AppState {
    pub pool: PgPool,
    pub pipeline: SentimentPipeline,
    pub extractor: KeyPointExtractor,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeReviewRequest {
    pub product_name: String,
    pub review_text: String,
}

/// Review record as returned to clients, with key points parsed back into
/// a list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewData {
    pub id: i64,
    pub product_name: String,
    pub review_text: String,
    pub sentiment: String,
    pub sentiment_score: f64,
    pub key_points: Vec<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeReviewResponse {
    pub success: bool,
    pub message: String,
    pub data: ReviewData,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ReviewData>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub database: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewListParams {
    /// Max records to return (default 50).
    pub limit: Option<i64>,
    /// Filter by sentiment: positive, negative or neutral.
    pub sentiment: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
}

fn server_error(error: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
        }),
    )
}

// Rejects bad input before any pipeline work runs.
fn validate_review(req: &AnalyzeReviewRequest) -> Result<(String, String), String> {
    let product_name = req.product_name.trim();
    let review_text = req.review_text.trim();

    if product_name.is_empty() {
        return Err("Product name is required".to_string());
    }
    if review_text.is_empty() {
        return Err("Review text is required".to_string());
    }
    if review_text.chars().count() < 10 {
        return Err("Review text too short (minimum 10 characters)".to_string());
    }

    Ok((product_name.to_string(), review_text.to_string()))
}

fn row_to_data(row: db::ReviewRow) -> ReviewData {
    // key_points is stored as a JSON string; a row that somehow fails to
    // parse shows up as an empty list instead of breaking the response.
    let key_points = serde_json::from_str(&row.key_points).unwrap_or_default();
    ReviewData {
        id: row.id,
        product_name: row.product_name,
        review_text: row.review_text,
        sentiment: row.sentiment,
        sentiment_score: row.sentiment_score,
        key_points,
        created_at: row.created_at,
    }
}

/// Analyze a product review and persist the result
#[utoipa::path(
    post,
    path = "/api/analyze-review",
    request_body = AnalyzeReviewRequest,
    responses(
        (status = 201, description = "Review analyzed and stored", body = AnalyzeReviewResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "reviews"
)]
pub async fn analyze_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeReviewRequest>,
) -> Result<(StatusCode, Json<AnalyzeReviewResponse>), ApiError> {
    let (product_name, review_text) = validate_review(&req).map_err(bad_request)?;

    println!("🚀 Analyzing review for '{}'", product_name);

    // Sentiment runs on the (possibly translated) text; key points work on
    // the original so they keep the review's language.
    let sentiment = state.pipeline.analyze(&review_text).await;
    let key_points = state.extractor.extract(&review_text).await;
    let key_points_json =
        serde_json::to_string(&key_points).unwrap_or_else(|_| "[]".to_string());

    let row = db::insert_review(
        &state.pool,
        &product_name,
        &review_text,
        sentiment.sentiment.as_str(),
        sentiment.score,
        &key_points_json,
    )
    .await
    .map_err(|e| {
        eprintln!("🔥 DB Error: {}", e);
        server_error("Failed to save review")
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AnalyzeReviewResponse {
            success: true,
            message: "Review analyzed successfully".to_string(),
            data: row_to_data(row),
        }),
    ))
}

/// List stored reviews, most recent first
#[utoipa::path(
    get,
    path = "/api/reviews",
    params(ReviewListParams),
    responses(
        (status = 200, description = "Stored reviews", body = ReviewListResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "reviews"
)]
pub async fn get_reviews(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReviewListParams>,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).max(1);
    let sentiment = params.sentiment.as_deref().map(|s| s.to_lowercase());

    let rows = db::list_reviews(&state.pool, sentiment.as_deref(), limit)
        .await
        .map_err(|e| {
            eprintln!("🔥 DB Error: {}", e);
            server_error("Failed to fetch reviews")
        })?;

    let data: Vec<ReviewData> = rows.into_iter().map(row_to_data).collect();

    Ok(Json(ReviewListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service status", body = HealthResponse)),
    tag = "reviews"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(HealthResponse {
        success: true,
        message: "API is running".to_string(),
        database: database.to_string(),
    })
}

pub async fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            error: "Endpoint not found".to_string(),
        }),
    )
}
