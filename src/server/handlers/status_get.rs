use crate::{error::Error as ToolvaultError, server::app_state::AppState};
use actix_web::{HttpResponse, web};
use serde::Serialize;

#[derive(Serialize)]
struct Status<'a> {
    version: &'a str,
}

pub async fn status_get(state: web::Data<AppState>) -> Result<HttpResponse, ToolvaultError> {
    Ok(HttpResponse::Ok().json(Status {
        version: &state.config.version,
    }))
}
