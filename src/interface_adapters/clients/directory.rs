use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct InvalidateRequest<'a> {
    code: &'a str,
}

#[derive(Debug)]
pub enum DirectoryError {
    Rejected,
    UpstreamUnavailable,
}

// Thin reqwest client for the external party-code directory. The session
// layer only ever needs one call: invalidating a code once its party closed,
// so stale QR codes and links stop resolving.
#[derive(Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn invalidate(&self, code: &str) -> Result<(), DirectoryError> {
        let url = format!("{}/codes/invalidate", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&InvalidateRequest { code })
            .send()
            .await
            .map_err(|_| DirectoryError::UpstreamUnavailable)?;

        if response.status().is_success() {
            return Ok(());
        }

        // An unknown code is already as invalid as it can get.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(DirectoryError::Rejected)
    }
}
