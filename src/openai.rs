//! OpenAI client construction.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client with a custom timeout.
///
/// The timeout covers the whole request, so a stalled upload surfaces as an error
/// instead of hanging the run.
pub fn create_client_with_timeout(api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::new().with_api_key(api_key)).with_http_client(http_client))
}
