use crate::{
    error::Error as ToolvaultError, oauth::OAuthError, server::app_state::AppState, users::User,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthRequestQuery {
    pub tool_id: Option<Uuid>,
}

/// GET /api/mcp/oauth/request, responds with `null` if the tool can be used right away.
pub async fn mcp_oauth_request(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<OAuthRequestQuery>,
) -> Result<HttpResponse, ToolvaultError> {
    let Some(tool_id) = query.tool_id else {
        return Err(ToolvaultError::client("Missing toolId"));
    };

    match state
        .api
        .oauth()
        .authorization_request(user.id, tool_id)
        .await
    {
        Ok(request) => Ok(HttpResponse::Ok().json(request)),
        Err(err) => {
            error!(user.id = %user.id, tool.id = %tool_id, "Failed to check MCP OAuth authorization: {err:?}");
            Err(match err.downcast::<OAuthError>() {
                Ok(oauth_err) => ToolvaultError::client(oauth_err.to_string()),
                Err(err) => err.into(),
            })
        }
    }
}
