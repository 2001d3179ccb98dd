mod mcp_oauth_callback;
mod mcp_oauth_request;
mod mcp_oauth_start;
mod status_get;
mod tools;
mod user_secrets;

pub use self::{
    mcp_oauth_callback::mcp_oauth_callback,
    mcp_oauth_request::mcp_oauth_request,
    mcp_oauth_start::mcp_oauth_start,
    status_get::status_get,
    tools::{tools_create, tools_delete, tools_get, tools_update},
    user_secrets::{user_secrets_create, user_secrets_delete, user_secrets_list},
};
