//! Endpoint handlers. Single-record reads share one flow: existence check,
//! cursor take (the only side effect in the API), indexed read, parse,
//! respond. Everything else is a pure projection of loaded state.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{mask_key, ApiError, AppState};
use crate::config::CursorScope;
use crate::cursor;
use crate::models::{
    classify_ticker, shape_for, GexRecord, GreekRecord, OrderflowRecord, RecordShape,
    TickerClass, FAMILY_CLASSIC, FAMILY_ORDERFLOW, FAMILY_STATE,
};
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub key: Option<String>,
}

/// Cursor-advancing read of one raw record line.
fn next_record_line(
    state: &AppState,
    ticker: &str,
    family: &str,
    category: &str,
    variant: Option<&str>,
    api_key: &str,
) -> Result<Vec<u8>, ApiError> {
    if !state.store.exists(ticker, family, category) {
        return Err(ApiError::NotFound(format!(
            "data not found for {ticker}/{family}/{category}"
        )));
    }

    let length = state
        .store
        .len_of(ticker, family, category)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    let cursor_key = match state.config.cursor_scope {
        CursorScope::Shared => cursor::shared_key(ticker, family, api_key),
        CursorScope::Independent => {
            cursor::independent_key(ticker, family, category, variant, api_key)
        }
    };

    let (index, exhausted) = state.cursors.take(&cursor_key, length);
    if exhausted {
        debug!(
            ticker,
            family,
            category,
            index,
            length,
            key = %mask_key(api_key),
            "data exhausted"
        );
        return Err(ApiError::NotFound("no more data available".to_string()));
    }

    let raw = state
        .store
        .raw_at(ticker, family, category, index)
        .map_err(|e| match e {
            StoreError::OutOfRange => ApiError::NotFound("index out of bounds".to_string()),
            other => ApiError::NotFound(other.to_string()),
        })?;

    debug!(
        ticker,
        family,
        category,
        index,
        key = %mask_key(api_key),
        "returning record"
    );
    Ok(raw)
}

fn parse_gex(raw: &[u8]) -> Result<GexRecord, ApiError> {
    serde_json::from_slice(raw)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("parse gex record: {e}")))
}

/// Maps a state endpoint kind to its category and record shape;
/// `full|zero|one` name chain aggregations, greek kinds name their category
/// directly.
fn state_category(kind: &str) -> Result<(String, RecordShape), ApiError> {
    let category = match kind {
        "full" | "zero" | "one" => format!("gex_{kind}"),
        other => other.to_string(),
    };
    match shape_for(FAMILY_STATE, &category) {
        Some(shape) => Ok((category, shape)),
        None => Err(ApiError::BadRequest(format!(
            "invalid type parameter: {kind}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Single-record endpoints
// ---------------------------------------------------------------------------

pub async fn orderflow_latest(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<OrderflowRecord>, ApiError> {
    let raw = next_record_line(
        &state,
        &ticker,
        FAMILY_ORDERFLOW,
        "orderflow",
        None,
        &query.key,
    )?;
    let record: OrderflowRecord = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("parse orderflow record: {e}")))?;
    Ok(Json(record))
}

pub async fn classic_chain(
    State(state): State<AppState>,
    Path((ticker, aggregation)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<GexRecord>, ApiError> {
    let category = chain_category(&aggregation)?;
    let raw = next_record_line(&state, &ticker, FAMILY_CLASSIC, &category, None, &query.key)?;
    Ok(Json(parse_gex(&raw)?))
}

pub async fn classic_majors(
    State(state): State<AppState>,
    Path((ticker, aggregation)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<MajorsResponse>, ApiError> {
    let category = chain_category(&aggregation)?;
    let raw = next_record_line(
        &state,
        &ticker,
        FAMILY_CLASSIC,
        &category,
        Some("majors"),
        &query.key,
    )?;
    Ok(Json(MajorsResponse::from(parse_gex(&raw)?)))
}

pub async fn classic_maxchange(
    State(state): State<AppState>,
    Path((ticker, aggregation)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<MaxChangeResponse>, ApiError> {
    let category = chain_category(&aggregation)?;
    let raw = next_record_line(
        &state,
        &ticker,
        FAMILY_CLASSIC,
        &category,
        Some("maxchange"),
        &query.key,
    )?;
    MaxChangeResponse::try_from_record(parse_gex(&raw)?).map(Json)
}

pub async fn state_profile(
    State(state): State<AppState>,
    Path((ticker, kind)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Response, ApiError> {
    let (category, shape) = state_category(&kind)?;
    let raw = next_record_line(&state, &ticker, FAMILY_STATE, &category, None, &query.key)?;

    match shape {
        RecordShape::Greek => {
            let record: GreekRecord = serde_json::from_slice(&raw)
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("parse greek record: {e}")))?;
            Ok(Json(record).into_response())
        }
        _ => Ok(Json(parse_gex(&raw)?).into_response()),
    }
}

pub async fn state_majors(
    State(state): State<AppState>,
    Path((ticker, kind)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<MajorsResponse>, ApiError> {
    let category = chain_category(&kind)?;
    let raw = next_record_line(
        &state,
        &ticker,
        FAMILY_STATE,
        &category,
        Some("majors"),
        &query.key,
    )?;
    Ok(Json(MajorsResponse::from(parse_gex(&raw)?)))
}

pub async fn state_maxchange(
    State(state): State<AppState>,
    Path((ticker, kind)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<MaxChangeResponse>, ApiError> {
    let category = chain_category(&kind)?;
    let raw = next_record_line(
        &state,
        &ticker,
        FAMILY_STATE,
        &category,
        Some("maxchange"),
        &query.key,
    )?;
    MaxChangeResponse::try_from_record(parse_gex(&raw)?).map(Json)
}

/// Chain aggregations are addressed as `full|zero|one` on the wire.
fn chain_category(aggregation: &str) -> Result<String, ApiError> {
    match aggregation {
        "full" | "zero" | "one" => Ok(format!("gex_{aggregation}")),
        other => Err(ApiError::BadRequest(format!(
            "invalid type parameter: {other}"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct MajorsResponse {
    pub timestamp: i64,
    pub ticker: String,
    pub spot: f64,
    pub mpos_vol: f64,
    pub mpos_oi: f64,
    pub mneg_vol: f64,
    pub mneg_oi: f64,
    pub zero_gamma: f64,
    pub net_gex_vol: f64,
    pub net_gex_oi: f64,
}

impl From<GexRecord> for MajorsResponse {
    fn from(rec: GexRecord) -> Self {
        Self {
            timestamp: rec.timestamp,
            ticker: rec.ticker,
            spot: rec.spot,
            mpos_vol: rec.major_pos_vol,
            mpos_oi: rec.major_pos_oi,
            mneg_vol: rec.major_neg_vol,
            mneg_oi: rec.major_neg_oi,
            zero_gamma: rec.zero_gamma,
            net_gex_vol: rec.sum_gex_vol,
            net_gex_oi: rec.sum_gex_oi,
        }
    }
}

/// Max-change projection: the six `max_priors` tuples spread over named
/// lookback windows.
#[derive(Debug, Serialize)]
pub struct MaxChangeResponse {
    pub timestamp: i64,
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub five: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ten: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifteen: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thirty: Option<Vec<f64>>,
}

impl MaxChangeResponse {
    fn try_from_record(rec: GexRecord) -> Result<Self, ApiError> {
        let mut response = Self {
            timestamp: rec.timestamp,
            ticker: rec.ticker,
            current: None,
            one: None,
            five: None,
            ten: None,
            fifteen: None,
            thirty: None,
        };
        if let Some(raw_priors) = rec.max_priors.as_ref() {
            if let Ok(rows) = serde_json::from_str::<Vec<Vec<f64>>>(raw_priors.get()) {
                // Windows are positional and only meaningful as a full set.
                if rows.len() >= 6 {
                    let mut rows = rows.into_iter();
                    response.current = rows.next();
                    response.one = rows.next();
                    response.five = rows.next();
                    response.ten = rows.next();
                    response.fifteen = rows.next();
                    response.thirty = rows.next();
                }
            }
        }
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Discovery and control endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TickersResponse {
    pub stocks: Vec<String>,
    pub indexes: Vec<String>,
    pub futures: Vec<String>,
}

pub async fn tickers(State(state): State<AppState>) -> Json<TickersResponse> {
    let mut stocks = Vec::new();
    let mut indexes = Vec::new();
    let mut futures = Vec::new();

    let mut seen: Vec<String> = state
        .store
        .keys()
        .into_iter()
        .map(|key| key.ticker)
        .collect();
    seen.sort();
    seen.dedup();

    for ticker in seen {
        match classify_ticker(&ticker) {
            TickerClass::Index => indexes.push(ticker),
            TickerClass::Future => futures.push(ticker),
            TickerClass::Stock => stocks.push(ticker),
        }
    }

    Json(TickersResponse {
        stocks,
        indexes,
        futures,
    })
}

#[derive(Debug, Serialize)]
pub struct DatesResponse {
    pub dates: Vec<String>,
    pub count: usize,
}

pub async fn dates(State(state): State<AppState>) -> Result<Json<DatesResponse>, ApiError> {
    let entries = std::fs::read_dir(&state.config.data_root)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("reading data directory: {e}")))?;

    let mut dates = Vec::new();
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if crate::config::is_date_dir_name(&name) {
            dates.push(name);
        }
    }
    dates.sort();
    let count = dates.len();

    Ok(Json(DatesResponse { dates, count }))
}

#[derive(Debug, Serialize)]
pub struct CurrentDateResponse {
    pub current_date: String,
    pub loaded_at: DateTime<Utc>,
    pub files_loaded: usize,
}

pub async fn current_date(State(state): State<AppState>) -> Json<CurrentDateResponse> {
    Json(CurrentDateResponse {
        current_date: state.config.data_date.clone(),
        loaded_at: state.loaded_at,
        files_loaded: state.store.keys().len(),
    })
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub message: String,
    pub count: usize,
}

pub async fn reset_cache(
    State(state): State<AppState>,
    Query(query): Query<ResetQuery>,
) -> Json<ResetResponse> {
    let subscriber = query.key.as_deref().filter(|k| !k.is_empty());
    let count = state.cursors.reset(subscriber);

    let message = match subscriber {
        Some(key) => format!("cursor positions reset for key: {key}"),
        None => "all cursor positions reset to index 0".to_string(),
    };
    info!(
        key = %subscriber.map(mask_key).unwrap_or_default(),
        count,
        "cursor reset"
    );

    Json(ResetResponse {
        status: "success".to_string(),
        message,
        count,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub data_date: String,
    pub data_mode: String,
    pub cache_mode: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        data_date: state.config.data_date.clone(),
        data_mode: state.store.mode().to_string(),
        cache_mode: state.cursors.mode().as_str().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Raw downloads
// ---------------------------------------------------------------------------

pub async fn download_classic(
    State(state): State<AppState>,
    Path((ticker, aggregation)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let category = chain_category(&aggregation)?;
    serve_record_file(&state, &ticker, FAMILY_CLASSIC, &category).await
}

pub async fn download_state(
    State(state): State<AppState>,
    Path((ticker, kind)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (category, _) = state_category(&kind)?;
    serve_record_file(&state, &ticker, FAMILY_STATE, &category).await
}

/// Streams the backing JSONL file as an attachment.
async fn serve_record_file(
    state: &AppState,
    ticker: &str,
    family: &str,
    category: &str,
) -> Result<Response, ApiError> {
    let path: PathBuf = state
        .config
        .data_root
        .join(&state.config.data_date)
        .join(ticker)
        .join(family)
        .join(format!("{category}.jsonl"));

    let file = tokio::fs::File::open(&path).await.map_err(|_| {
        ApiError::NotFound(format!("file not found: {ticker}/{family}/{category}.jsonl"))
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stat download file: {e}")))?
        .len();

    info!(ticker, family, category, size, "serving raw download");

    let body = Body::from_stream(ReaderStream::new(file));
    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{ticker}_{family}_{category}.jsonl\""),
        )
        .header(header::CONTENT_LENGTH, size)
        .body(body)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("build download response: {e}")))?;
    Ok(response)
}
