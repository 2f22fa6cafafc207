use std::time::Duration;

use reqwest::Client;

use crate::error::Result;

pub const USER_AGENT: &str = concat!("slicedl/", env!("CARGO_PKG_VERSION"));

pub fn build_client(connect_timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .build()?;
    Ok(client)
}

/// Client used for the preflight probe when the caller does not supply one.
pub fn default_client() -> Result<Client> {
    build_client(Duration::from_secs(10))
}
