mod api_ext;
mod authorization_request;
mod authorization_server;
mod oauth_client;
mod oauth_error;
mod oauth_state;
mod pending_authorization;
mod pkce;
mod popup_message;
mod token_set;

pub use self::{
    api_ext::{AccessTokenResolution, AuthorizationStart, AuthorizeUrl, OAuthApiExt},
    authorization_request::{AuthorizationRequest, AuthorizationStatus},
    authorization_server::AuthorizationServer,
    oauth_client::OAuthClient,
    oauth_error::OAuthError,
    oauth_state::{OAuthStatePayload, OAuthStateSigner},
    pending_authorization::PendingAuthorization,
    pkce::PkcePair,
    popup_message::PopupMessage,
    token_set::McpOAuthTokenSet,
};
