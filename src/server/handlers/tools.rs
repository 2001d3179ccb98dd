use crate::{
    error::Error as ToolvaultError,
    server::app_state::AppState,
    tools::{ToolCreateParams, ToolUpdateParams},
    users::User,
};
use actix_web::{HttpResponse, web};
use tracing::{error, info};
use uuid::Uuid;

/// POST /api/tools
pub async fn tools_create(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<ToolCreateParams>,
) -> Result<HttpResponse, ToolvaultError> {
    state.ensure_admin(&user)?;

    match state.api.tools().create_tool(body.into_inner()).await {
        Ok(tool) => {
            info!(user.id = %user.id, tool.id = %tool.id, "Created tool.");
            Ok(HttpResponse::Created().json(tool.masked()))
        }
        Err(err) => {
            error!(user.id = %user.id, "Failed to create tool: {err:?}");
            Err(err.into())
        }
    }
}

/// GET /api/tools/{id}
pub async fn tools_get(
    state: web::Data<AppState>,
    _user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ToolvaultError> {
    match state.api.tools().get_tool(path.into_inner()).await? {
        Some(tool) => Ok(HttpResponse::Ok().json(tool.masked())),
        None => Err(ToolvaultError::not_found("Tool not found.")),
    }
}

/// PUT /api/tools/{id}
pub async fn tools_update(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
    body: web::Json<ToolUpdateParams>,
) -> Result<HttpResponse, ToolvaultError> {
    state.ensure_admin(&user)?;

    let id = path.into_inner();
    match state.api.tools().update_tool(id, body.into_inner()).await {
        Ok(tool) => {
            info!(user.id = %user.id, tool.id = %tool.id, "Updated tool.");
            Ok(HttpResponse::Ok().json(tool.masked()))
        }
        Err(err) => {
            error!(user.id = %user.id, tool.id = %id, "Failed to update tool: {err:?}");
            Err(err.into())
        }
    }
}

/// DELETE /api/tools/{id}
pub async fn tools_delete(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ToolvaultError> {
    state.ensure_admin(&user)?;

    let id = path.into_inner();
    match state.api.tools().remove_tool(id).await? {
        Some(_) => {
            info!(user.id = %user.id, tool.id = %id, "Removed tool.");
            Ok(HttpResponse::NoContent().finish())
        }
        None => Err(ToolvaultError::not_found("Tool not found.")),
    }
}
