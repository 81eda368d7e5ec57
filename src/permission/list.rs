//! Endpoints for reading the permission catalogue.

use crate::{
    ApiResponse, Error,
    extract::Path,
    permission::{Permission, PermissionInfo},
};

/// List every permission in ID order.
pub async fn list_permissions_endpoint() -> ApiResponse<Vec<PermissionInfo>> {
    ApiResponse::success(Permission::ALL.into_iter().map(PermissionInfo::from).collect())
}

/// Get a single permission by its ID.
pub async fn get_permission_endpoint(
    Path(permission_id): Path<i64>,
) -> Result<ApiResponse<PermissionInfo>, Error> {
    let permission = Permission::from_id(permission_id)?;

    Ok(ApiResponse::success(permission.into()))
}
