mod app_state;
mod extractors;
mod handlers;

use crate::{
    api::Api, config::Config, database::Database, network::Network, server::app_state::AppState,
    templates::create_templates,
};
use actix_session::{SessionMiddleware, config::CookieContentSecurity, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};
use anyhow::{Context, bail};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

/// Name of the cookie that holds the short-lived session with the pending OAuth authorization.
const SESSION_COOKIE_NAME: &str = "toolvault_oauth";

#[actix_web::main]
pub async fn run(config: Config, http_port: u16) -> Result<(), anyhow::Error> {
    let database = Database::open(|| Ok(config.db.url.clone())).await?;
    let network = Network::create(&config.http.client)?;
    let api = Api::new(config.clone(), database, network, create_templates()?);

    let session_key = session_key(&config)?;
    let http_server_url = format!("0.0.0.0:{http_port}");
    let state = web::Data::new(AppState::new(config, api));
    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::NormalizePath::trim())
            .wrap(session_middleware(&state.config, session_key.clone()))
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(configure_routes)
    });

    let http_server = http_server
        .bind(&http_server_url)
        .with_context(|| format!("Failed to bind to {}.", &http_server_url))?;

    info!("Toolvault API server is available at http://{http_server_url}");

    http_server
        .run()
        .await
        .with_context(|| "Failed to run Toolvault API server.")
}

fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/status", web::get().to(handlers::status_get))
            .service(
                web::scope("/user/secrets")
                    .route("", web::get().to(handlers::user_secrets_list))
                    .route("", web::post().to(handlers::user_secrets_create))
                    .route("/{id}", web::delete().to(handlers::user_secrets_delete)),
            )
            .service(
                web::scope("/tools")
                    .route("", web::post().to(handlers::tools_create))
                    .route("/{id}", web::get().to(handlers::tools_get))
                    .route("/{id}", web::put().to(handlers::tools_update))
                    .route("/{id}", web::delete().to(handlers::tools_delete)),
            )
            .service(
                web::scope("/mcp/oauth")
                    .route("/request", web::get().to(handlers::mcp_oauth_request))
                    .route("/start", web::get().to(handlers::mcp_oauth_start))
                    .route("/callback", web::get().to(handlers::mcp_oauth_callback)),
            ),
    );
}

/// Session cookie is private (encrypted and signed) and lives no longer than the OAuth state.
fn session_middleware(config: &Config, key: Key) -> SessionMiddleware<CookieSessionStore> {
    let state_ttl = actix_web::cookie::time::Duration::seconds(
        i64::try_from(config.oauth.state_ttl.as_secs()).unwrap_or(i64::MAX),
    );
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE_NAME.to_string())
        .cookie_secure(config.public_url.scheme() == "https")
        .cookie_content_security(CookieContentSecurity::Private)
        .session_lifecycle(
            actix_session::config::BrowserSession::default().state_ttl(state_ttl),
        )
        .build()
}

fn session_key(config: &Config) -> anyhow::Result<Key> {
    let Some(ref session_key) = config.security.session_key else {
        warn!(
            "Session key is not configured, a random one is used. Pending OAuth authorizations won't survive restarts."
        );
        return Ok(Key::generate());
    };

    let session_key =
        hex::decode(session_key).with_context(|| "Session key is not a valid hex string.")?;
    if session_key.len() < 64 {
        bail!("Session key should be at least 64 bytes long.");
    }

    Ok(Key::from(session_key.as_slice()))
}
