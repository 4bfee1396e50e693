use std::time::Duration;

use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        ACCEPT,
        USER_AGENT,
    },
    Client,
};

use crate::core::FlashdeckError;

/// Builds the shared async client. `timeout` of `None` leaves requests unbounded.
pub fn http_client(timeout: Option<Duration>) -> Result<Client, FlashdeckError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("flashdeck/0.1 (+reqwest)"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = Client::builder().default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(|e| FlashdeckError::Custom(format!("HTTP client build failed: {e}")))
}
