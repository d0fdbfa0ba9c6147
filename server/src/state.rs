use std::sync::Arc;

use reqwest::Client;

use super::{
    catalog::Catalog, config::Config, firestore::FirestoreStore, identity::IdentityClient,
};

pub struct State {
    pub config: Config,
    pub catalog: Catalog<FirestoreStore>,
    pub identity: IdentityClient,
}

impl State {
    pub fn new() -> Arc<Self> {
        let config = Config::load();

        let http = Client::new();
        let store = FirestoreStore::new(http.clone(), &config.project_id, &config.api_key);
        let identity = IdentityClient::new(http, &config.api_key);

        Arc::new(Self {
            catalog: Catalog::new(store),
            identity,
            config,
        })
    }
}
