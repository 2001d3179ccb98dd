use crate::{api::Api, config::Config, error::Error as ToolvaultError, users::User};

pub struct AppState {
    pub config: Config,
    pub api: Api,
}

impl AppState {
    pub fn new(config: Config, api: Api) -> Self {
        Self { config, api }
    }

    /// Tools can only be managed by administrators.
    pub fn ensure_admin(&self, user: &User) -> Result<(), ToolvaultError> {
        if !user.is_admin {
            return Err(ToolvaultError::access_forbidden());
        }

        Ok(())
    }
}
