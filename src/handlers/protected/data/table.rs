use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    response::Json,
};
use serde_json::{Map, Value};

use crate::database::models::Schema;
use crate::database::record;
use crate::database::repository::{parse_custom_paths, Repository, TableInit};
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::state::AppState;

const INIT_FLAG: &str = "_init";
const INIT_SCHEMA: &str = "_schema";
const INIT_CUSTOM_PATHS: &str = "_customPaths";
const INIT_PRIMARY_KEY: &str = "_primaryKey";

/// GET /:container/:table - List records
///
/// `?field=value` filters are exact-match and AND-combined. `page` / `limit`
/// switch the response from a bare array to `{page, limit, total, data}`.
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Value> {
    let query = ListQuery::parse(params, &state.config.api)?;
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    let output = repository.list(&query).await?;
    Ok(ApiResponse::success(output.into_json()))
}

/// POST /:container/:table - Create a record, or initialise the table when
/// the body carries `_init` (with optional `_schema`, `_customPaths`,
/// `_primaryKey`)
pub async fn post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload?;
    let record = record::from_json(payload)?;
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;

    if is_init_request(&record) {
        let init = parse_table_init(&record)?;
        let view = repository.init_table(init).await?;
        return Ok(ApiResponse::created(view));
    }

    let created = repository.create(record).await?;
    Ok(ApiResponse::created(Value::Object(created)))
}

/// DELETE /:container/:table - Drop the table and its aliases
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
) -> ApiResult<()> {
    Repository::new(&state, &auth.workspace_id, &container, &table)?
        .drop_table()
        .await?;
    Ok(ApiResponse::no_content())
}

fn is_init_request(body: &Map<String, Value>) -> bool {
    match body.get(INIT_FLAG) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn parse_table_init(body: &Map<String, Value>) -> Result<TableInit, ApiError> {
    let schema = match body.get(INIT_SCHEMA) {
        None | Some(Value::Null) => None,
        Some(raw) => Some(serde_json::from_value::<Schema>(raw.clone()).map_err(|e| {
            ApiError::bad_request(format!("Invalid _schema (types are String, Number, Boolean, Date): {}", e))
        })?),
    };

    let custom_paths = match body.get(INIT_CUSTOM_PATHS) {
        None | Some(Value::Null) => Default::default(),
        Some(Value::Object(raw)) => parse_custom_paths(raw)?,
        Some(_) => return Err(ApiError::bad_request("_customPaths must be an object")),
    };

    let primary_key = match body.get(INIT_PRIMARY_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(field)) => Some(field.clone()),
        Some(_) => return Err(ApiError::bad_request("_primaryKey must be a string")),
    };

    Ok(TableInit {
        schema,
        custom_paths,
        primary_key,
    })
}
