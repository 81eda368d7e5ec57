//! Endpoints for managing cost types.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;

use crate::{
    ApiResponse, AppState, Error,
    cost_type::{
        CostType, CostTypeData, CostTypeName, create_cost_type, delete_cost_type,
        get_all_cost_types, get_cost_type, update_cost_type,
    },
    database_id::CostTypeId,
    extract::{Json, Path},
};

/// The state needed by the cost type endpoints.
#[derive(Debug, Clone)]
pub struct CostTypeState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CostTypeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List all cost types ordered by name.
pub async fn list_cost_types_endpoint(
    State(state): State<CostTypeState>,
) -> Result<ApiResponse<Vec<CostType>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_all_cost_types(&connection).map(ApiResponse::success)
}

pub async fn get_cost_type_endpoint(
    State(state): State<CostTypeState>,
    Path(cost_type_id): Path<CostTypeId>,
) -> Result<ApiResponse<CostType>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_cost_type(cost_type_id, &connection).map(ApiResponse::success)
}

pub async fn create_cost_type_endpoint(
    State(state): State<CostTypeState>,
    Json(data): Json<CostTypeData>,
) -> Result<ApiResponse<CostType>, Error> {
    let name = CostTypeName::new(&data.name)?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let cost_type = create_cost_type(name, &connection)?;
    tracing::info!("Created cost type \"{}\"", cost_type.name);

    Ok(ApiResponse::created(cost_type))
}

pub async fn update_cost_type_endpoint(
    State(state): State<CostTypeState>,
    Path(cost_type_id): Path<CostTypeId>,
    Json(data): Json<CostTypeData>,
) -> Result<ApiResponse<CostType>, Error> {
    let name = CostTypeName::new(&data.name)?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    update_cost_type(cost_type_id, name, &connection).map(ApiResponse::success)
}

/// Delete a cost type that no transaction uses.
pub async fn delete_cost_type_endpoint(
    State(state): State<CostTypeState>,
    Path(cost_type_id): Path<CostTypeId>,
) -> Result<ApiResponse<CostTypeId>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_cost_type(cost_type_id, &connection)?;

    Ok(ApiResponse::success(cost_type_id))
}
