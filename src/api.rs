use crate::{config::Config, database::Database, network::Network};
use handlebars::Handlebars;

/// Collection of the service APIs, extensions are implemented separately in every module.
pub struct Api {
    pub config: Config,
    pub db: Database,
    pub network: Network,
    pub templates: Handlebars<'static>,
}

impl Api {
    /// Instantiates APIs collection with the specified config, database, network and templates.
    pub fn new(
        config: Config,
        database: Database,
        network: Network,
        templates: Handlebars<'static>,
    ) -> Self {
        Self {
            config,
            db: database,
            network,
            templates,
        }
    }
}

impl AsRef<Api> for Api {
    fn as_ref(&self) -> &Self {
        self
    }
}
