//! Review persistence on Postgres.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPool, FromRow};
use utoipa::ToSchema;

/// A persisted review with its analysis results. Records are insert-only:
/// never mutated, never deleted.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub product_name: String,
    pub review_text: String,
    pub sentiment: String,
    pub sentiment_score: f64,
    /// JSON-serialized list of key points.
    pub key_points: String,
    pub created_at: Option<String>,
}

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id BIGSERIAL PRIMARY KEY,
            product_name VARCHAR(200) NOT NULL,
            review_text TEXT NOT NULL,
            sentiment VARCHAR(20) NOT NULL,
            sentiment_score DOUBLE PRECISION NOT NULL,
            key_points TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts one analyzed review. The insert is a single statement, so a
/// failure rolls back this request's write and nothing else.
pub async fn insert_review(
    pool: &PgPool,
    product_name: &str,
    review_text: &str,
    sentiment: &str,
    sentiment_score: f64,
    key_points_json: &str,
) -> Result<ReviewRow> {
    let row: ReviewRow = sqlx::query_as(
        r#"INSERT INTO reviews (product_name, review_text, sentiment, sentiment_score, key_points)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id, product_name, review_text, sentiment, sentiment_score, key_points,
                     to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') as created_at"#,
    )
    .bind(product_name)
    .bind(review_text)
    .bind(sentiment)
    .bind(sentiment_score)
    .bind(key_points_json)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Most-recent-first listing with an optional sentiment filter. The id
/// tiebreak keeps ordering stable for records created within the same
/// second.
pub async fn list_reviews(
    pool: &PgPool,
    sentiment: Option<&str>,
    limit: i64,
) -> Result<Vec<ReviewRow>> {
    let rows: Vec<ReviewRow> = match sentiment {
        Some(sentiment) => {
            sqlx::query_as(
                r#"SELECT id, product_name, review_text, sentiment, sentiment_score, key_points,
                      to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') as created_at
                   FROM reviews
                   WHERE sentiment = $1
                   ORDER BY created_at DESC, id DESC
                   LIMIT $2"#,
            )
            .bind(sentiment)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"SELECT id, product_name, review_text, sentiment, sentiment_score, key_points,
                      to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS') as created_at
                   FROM reviews
                   ORDER BY created_at DESC, id DESC
                   LIMIT $1"#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
