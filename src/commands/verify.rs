//! Check the configured credentials without opening the stream.

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::logging::log_json;
use crate::twitter::{TwitterClient, User, VerifyParams};

pub async fn run(config: &Config) -> Result<User> {
    if config.credentials.has_missing() {
        info!("Some Twitter credentials are empty; the request will likely be rejected");
    }

    let client = TwitterClient::new(&config.credentials, config.endpoints.clone())?;
    let user = client.verify_credentials(&VerifyParams::default()).await?;

    log_json("Authenticated as:", &user);
    Ok(user)
}
