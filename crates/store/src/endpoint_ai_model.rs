use ollama_fleet_core::{AiModelStatus, Endpoint, EndpointStatus, ModelMeasurement};
use sqlx::{FromRow, Postgres, Transaction};

use crate::error::StoreResult;
use crate::pool::DbPool;

#[derive(FromRow)]
struct ExistingLink {
    ai_model_id: i64,
    max_connection_time: Option<f64>,
}

/// Applies one probe's full outcome to `endpoint_id` inside a single
/// transaction (spec.md §4.3 "Probe result application (atomic update)"):
/// records the `EndpointPerformance` liveness snapshot, ensures each
/// `AiModel` vocabulary row exists, upserts the `endpoint_ai_models` link
/// (status, token_per_second, a running max of `connection_time`), appends
/// one `ai_model_performances` row per measurement, and marks every link
/// not present in `measurements` as `Missing` with its own appended
/// history row. Mirrors `process_models_test_results` applying everything
/// in one DB round of work rather than accumulating ORM objects first; a
/// crash partway through leaves neither the snapshot nor the link updates
/// committed, instead of a liveness snapshot with no matching measurement.
pub async fn apply_probe_measurements(
    pool: &DbPool,
    endpoint_id: i64,
    endpoint_status: EndpointStatus,
    ollama_version: Option<&str>,
    measurements: &[ModelMeasurement],
) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    crate::endpoint::record_performance(&mut *tx, endpoint_id, endpoint_status, ollama_version).await?;

    let existing: Vec<ExistingLink> = sqlx::query_as(
        "SELECT ai_model_id, max_connection_time FROM endpoint_ai_models WHERE endpoint_id = $1",
    )
    .bind(endpoint_id)
    .fetch_all(&mut *tx)
    .await?;
    let mut missing_ids: std::collections::HashSet<i64> =
        existing.iter().map(|link| link.ai_model_id).collect();

    for measurement in measurements {
        let model_id = get_or_create_model_tx(&mut tx, &measurement.name, &measurement.tag).await?;
        missing_ids.remove(&model_id);

        let prior_max = existing
            .iter()
            .find(|link| link.ai_model_id == model_id)
            .and_then(|link| link.max_connection_time);
        let new_max = match prior_max {
            Some(prior) => prior.max(measurement.connection_time),
            None => measurement.connection_time,
        };

        sqlx::query(
            r#"
            INSERT INTO endpoint_ai_models (endpoint_id, ai_model_id, status, token_per_second, max_connection_time)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (endpoint_id, ai_model_id) DO UPDATE
            SET status = EXCLUDED.status,
                token_per_second = EXCLUDED.token_per_second,
                max_connection_time = EXCLUDED.max_connection_time
            "#,
        )
        .bind(endpoint_id)
        .bind(model_id)
        .bind(measurement.status.as_str())
        .bind(measurement.token_per_second)
        .bind(new_max)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ai_model_performances
                (endpoint_id, ai_model_id, status, token_per_second, connection_time, total_time, output, output_tokens)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(endpoint_id)
        .bind(model_id)
        .bind(measurement.status.as_str())
        .bind(measurement.token_per_second)
        .bind(measurement.connection_time)
        .bind(measurement.total_time)
        .bind(&measurement.output)
        .bind(measurement.output_tokens)
        .execute(&mut *tx)
        .await?;
    }

    for model_id in missing_ids {
        sqlx::query(
            r#"
            UPDATE endpoint_ai_models
            SET status = 'missing', token_per_second = 0
            WHERE endpoint_id = $1 AND ai_model_id = $2
            "#,
        )
        .bind(endpoint_id)
        .bind(model_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ai_model_performances (endpoint_id, ai_model_id, status)
            VALUES ($1, $2, 'missing')
            "#,
        )
        .bind(endpoint_id)
        .bind(model_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn get_or_create_model_tx(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    tag: &str,
) -> StoreResult<i64> {
    if let Some((id,)) =
        sqlx::query_as::<_, (i64,)>("SELECT id FROM ai_models WHERE name = $1 AND tag = $2")
            .bind(name)
            .bind(tag)
            .fetch_optional(&mut **tx)
            .await?
    {
        return Ok(id);
    }
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO ai_models (name, tag)
        VALUES ($1, $2)
        ON CONFLICT (name, tag) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(tag)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

#[derive(FromRow)]
struct EndpointRow {
    id: i64,
    url: String,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<EndpointRow> for Endpoint {
    fn from(row: EndpointRow) -> Self {
        Endpoint {
            id: row.id,
            url: row.url,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// The Router's hot path: every `Available` endpoint currently serving
/// `(name, tag)`, ranked fastest-first. Ties on throughput break toward the
/// lower max connection latency, then the lower endpoint id for determinism.
pub async fn best_endpoints_for_model(
    pool: &DbPool,
    name: &str,
    tag: &str,
) -> StoreResult<Vec<Endpoint>> {
    let rows: Vec<EndpointRow> = sqlx::query_as(
        r#"
        SELECT e.*
        FROM endpoints e
        JOIN endpoint_ai_models link ON link.endpoint_id = e.id
        JOIN ai_models m ON m.id = link.ai_model_id
        WHERE m.name = $1 AND m.tag = $2 AND link.status = 'available'
        ORDER BY link.token_per_second DESC, link.max_connection_time ASC NULLS LAST, e.id ASC
        "#,
    )
    .bind(name)
    .bind(tag)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Endpoint::from).collect())
}

/// Paginated view of one endpoint's current model links, for
/// `GET /endpoint/{id}/ai-models`.
pub async fn list_links_for_endpoint(
    pool: &DbPool,
    endpoint_id: i64,
) -> StoreResult<Vec<(ollama_fleet_core::AiModel, ollama_fleet_core::EndpointAiModel)>> {
    #[derive(FromRow)]
    struct LinkRow {
        endpoint_id: i64,
        ai_model_id: i64,
        status: String,
        token_per_second: f64,
        max_connection_time: Option<f64>,
        model_id: i64,
        model_name: String,
        model_tag: String,
        model_created_at: chrono::DateTime<chrono::Utc>,
    }

    let rows: Vec<LinkRow> = sqlx::query_as(
        r#"
        SELECT
            link.endpoint_id,
            link.ai_model_id,
            link.status,
            link.token_per_second,
            link.max_connection_time,
            m.id AS model_id,
            m.name AS model_name,
            m.tag AS model_tag,
            m.created_at AS model_created_at
        FROM endpoint_ai_models link
        JOIN ai_models m ON m.id = link.ai_model_id
        WHERE link.endpoint_id = $1
        ORDER BY m.name ASC, m.tag ASC
        "#,
    )
    .bind(endpoint_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let status: AiModelStatus = row.status.parse()?;
            let model = ollama_fleet_core::AiModel {
                id: row.model_id,
                name: row.model_name,
                tag: row.model_tag,
                created_at: row.model_created_at,
            };
            let link = ollama_fleet_core::EndpointAiModel {
                endpoint_id: row.endpoint_id,
                ai_model_id: row.ai_model_id,
                status,
                token_per_second: row.token_per_second,
                max_connection_time: row.max_connection_time.unwrap_or(0.0),
            };
            Ok((model, link))
        })
        .collect::<StoreResult<Vec<_>>>()
}
