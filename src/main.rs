mod api;
mod config;
mod db;
mod keypoints;
mod language;
mod pipeline;
mod sentiment;

use axum::{
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::AppConfig;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::analyze_review,
        api::get_reviews,
        api::health_check
    ),
    components(
        schemas(
            api::AnalyzeReviewRequest,
            api::AnalyzeReviewResponse,
            api::ReviewListResponse,
            api::ReviewData,
            api::HealthResponse,
            api::ErrorResponse,
            sentiment::Sentiment,
            sentiment::SentimentResult,
            db::ReviewRow
        )
    ),
    tags(
        (name = "reviews", description = "Product Review Analysis API")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    db::init_db(&pool).await?;

    let app_config = AppConfig::from_env();
    let http_client = reqwest::Client::builder()
        .timeout(app_config.request_timeout)
        .build()?;
    let pipeline = pipeline::SentimentPipeline::new(http_client.clone(), &app_config);
    let extractor = keypoints::KeyPointExtractor::new(
        http_client,
        app_config.gemini_api_url.clone(),
        app_config.gemini_api_key.clone(),
    );

    let state = Arc::new(api::AppState {
        pool,
        pipeline,
        extractor,
    });

    let app = Router::new()
        .merge(SwaggerUi::new("/review-analyzer-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/analyze-review", post(api::analyze_review))
        .route("/api/reviews", get(api::get_reviews))
        .route("/api/health", get(api::health_check))
        .fallback(api::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
