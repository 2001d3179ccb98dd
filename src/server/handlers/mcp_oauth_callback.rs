use crate::{
    error::{Error as ToolvaultError, ErrorKind},
    oauth::{OAuthError, PendingAuthorization, PopupMessage},
    server::app_state::AppState,
};
use actix_session::Session;
use actix_web::{
    HttpResponse,
    http::{
        StatusCode,
        header::{CACHE_CONTROL, ContentType},
    },
    web,
};
use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /api/mcp/oauth/callback
///
/// Consumer is the browser popup, so every outcome is rendered as a page that notifies the
/// window that opened it.
pub async fn mcp_oauth_callback(
    state: web::Data<AppState>,
    query: web::Query<OAuthCallbackQuery>,
    session: Session,
) -> Result<HttpResponse, ToolvaultError> {
    // Pending authorization can be used only once, whatever the outcome is.
    let pending = match session.remove_as::<PendingAuthorization>(PendingAuthorization::SESSION_KEY)
    {
        Some(Ok(pending)) => Some(pending),
        Some(Err(_)) => {
            warn!("Pending MCP OAuth authorization cannot be deserialized.");
            None
        }
        None => None,
    };

    let query = query.into_inner();
    if let Some(error) = query.error {
        info!("MCP OAuth authorization was rejected by the authorization server: {error}.");
        return render_popup(
            &state,
            StatusCode::BAD_REQUEST,
            PopupMessage::error(query.error_description.unwrap_or(error)),
        );
    }

    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return render_popup(
            &state,
            StatusCode::BAD_REQUEST,
            PopupMessage::error("Missing code or state"),
        );
    };

    let Some(pending) = pending else {
        return render_popup(
            &state,
            StatusCode::BAD_REQUEST,
            PopupMessage::error(
                OAuthError::InvalidState("authorization session has expired".to_string())
                    .to_string(),
            ),
        );
    };

    match state
        .api
        .oauth()
        .complete_authorization(&pending, &oauth_state, &code)
        .await
    {
        Ok(tool) => render_popup(
            &state,
            StatusCode::OK,
            PopupMessage::Complete {
                tool_id: tool.id,
                tool_name: tool.name,
                return_url: pending.return_url,
            },
        ),
        Err(err) => {
            let (status, message) = match err.downcast::<OAuthError>() {
                Ok(oauth_err) => {
                    warn!(user.id = %pending.user_id, tool.id = %pending.tool_id, "Failed to complete MCP OAuth authorization: {oauth_err}");
                    (StatusCode::BAD_REQUEST, oauth_err.to_string())
                }
                Err(err) => {
                    error!(user.id = %pending.user_id, tool.id = %pending.tool_id, "Failed to complete MCP OAuth authorization: {err:?}");
                    let err = ToolvaultError::from(err);
                    let status = match err.kind() {
                        ErrorKind::NotFound => StatusCode::NOT_FOUND,
                        ErrorKind::ClientError => StatusCode::BAD_REQUEST,
                        _ => StatusCode::INTERNAL_SERVER_ERROR,
                    };
                    (status, err.public_message())
                }
            };
            render_popup(&state, status, PopupMessage::error(message))
        }
    }
}

fn render_popup(
    state: &AppState,
    status: StatusCode,
    message: PopupMessage,
) -> Result<HttpResponse, ToolvaultError> {
    let page = state.api.oauth().render_popup_page(&message)?;
    Ok(HttpResponse::build(status)
        .content_type(ContentType::html())
        .insert_header((CACHE_CONTROL, "no-store"))
        .body(page))
}
