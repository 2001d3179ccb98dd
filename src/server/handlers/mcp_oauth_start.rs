use crate::{
    error::Error as ToolvaultError,
    oauth::{OAuthError, PendingAuthorization},
    server::app_state::AppState,
    users::User,
};
use actix_session::Session;
use actix_web::{HttpResponse, http::header::LOCATION, web};
use anyhow::anyhow;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStartQuery {
    pub tool_id: Option<Uuid>,
    pub return_url: Option<String>,
}

/// GET /api/mcp/oauth/start
pub async fn mcp_oauth_start(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<OAuthStartQuery>,
    session: Session,
) -> Result<HttpResponse, ToolvaultError> {
    let Some(tool_id) = query.tool_id else {
        return Err(ToolvaultError::client("Missing toolId"));
    };

    let start = match state
        .api
        .oauth()
        .start_authorization(user.id, tool_id, query.return_url.as_deref())
        .await
    {
        Ok(start) => start,
        Err(err) => {
            error!(user.id = %user.id, tool.id = %tool_id, "Failed to start MCP OAuth authorization: {err:?}");
            return Err(match err.downcast::<OAuthError>() {
                Ok(oauth_err) => ToolvaultError::client(oauth_err.to_string()),
                Err(err) => err.into(),
            });
        }
    };

    // Any previously started authorization is replaced.
    session
        .insert(PendingAuthorization::SESSION_KEY, &start.pending)
        .map_err(|err| {
            ToolvaultError::from(anyhow!("Failed to store pending authorization: {err}"))
        })?;

    Ok(HttpResponse::Found()
        .insert_header((LOCATION, start.authorize_url.url.as_str()))
        .finish())
}
