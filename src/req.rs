use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::{errors::TransportError, logging::targets, prelude::*, Error};

/// Thin JSON-over-HTTP client shared by the DLN transport and the holder source.
///
/// It never retries: retry policy belongs to the caller, which needs to see
/// every individual failure to classify it.
#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
}

async fn parse_response(response: Response) -> std::result::Result<String, TransportError> {
    let status_code = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::NoResponse(e.to_string()))?;

    if status_code < 400 {
        return Ok(text);
    }
    Err(TransportError::Status {
        status: status_code,
        body: text,
    })
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::GenericRequest(e.to_string()))?;
        Ok(Self { client })
    }

    /// GET `url` with `query` parameters, returning the raw body of a non-error response.
    pub async fn get<Q>(
        &self,
        url: &str,
        query: &Q,
        headers: &[(&str, &str)],
    ) -> std::result::Result<String, TransportError>
    where
        Q: Serialize + ?Sized,
    {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(query);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::NoResponse(e.to_string()))?;
        debug!(target: targets::HTTP, url = %url, status = response.status().as_u16(), "HTTP GET");

        parse_response(response).await
    }
}
