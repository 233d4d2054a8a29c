pub mod check;
pub mod sync;

use anyhow::{Context as _, Result};
use callkit::RetryingExecutor;
use goalkit::report::salesforce::{DEFAULT_API_VERSION, DEFAULT_LOGIN_URL};
use goalkit::{
    AsanaStore, Authenticator, JwtBearer, NoReports, ReportSource, SalesforceReports, StaticCredential,
    SyncEngine,
};

use crate::config::{Config, SalesforceAuth};

/// Wire the goal store and report service described by `config` into an engine
pub fn build_engine(config: &Config) -> Result<SyncEngine> {
    let book = config.goal_book()?;
    let executor = RetryingExecutor::new().retry_config(config.retry.to_config());

    let store = match &config.asana.base_url {
        Some(url) => AsanaStore::with_base_url(url.clone(), config.asana.access_token.clone(), executor.clone()),
        None => AsanaStore::new(config.asana.access_token.clone(), executor.clone()),
    };

    let reports: Box<dyn ReportSource> = match config.salesforce_auth()? {
        None => Box::new(NoReports),
        Some(auth) => {
            let settings = config.salesforce.as_ref();
            let login_url = settings
                .and_then(|s| s.login_url.clone())
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
            let api_version = settings
                .and_then(|s| s.api_version.clone())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

            let authenticator: Box<dyn Authenticator> = match auth {
                SalesforceAuth::Jwt {
                    username,
                    client_id,
                    private_key_file,
                } => Box::new(
                    JwtBearer::from_key_file(client_id, username, &private_key_file, login_url, executor.clone())
                        .context("Could not load the Salesforce private key")?,
                ),
                SalesforceAuth::Token {
                    access_token,
                    instance_url,
                } => Box::new(StaticCredential::new(instance_url, access_token)),
            };

            Box::new(SalesforceReports::new(authenticator, executor).api_version(api_version))
        }
    };

    Ok(SyncEngine::new(book, Box::new(store), reports))
}
