use crate::common::TransportError;
use crate::config::ServiceConfig;
use crate::domains::trajectory::{PredictionRequest, PredictionTransport};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Posts prediction requests as multipart forms using reqwest.
#[derive(Clone)]
pub struct HttpPredictionTransport {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPredictionTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                TransportError::Connection(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { client, endpoint: endpoint.into(), timeout })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, TransportError> {
        Self::new(config.endpoint.clone(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(request: &PredictionRequest) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }
        let image = Part::bytes(request.image.clone())
            .file_name("observation.png")
            .mime_str("image/png")
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(form.part("image", image))
    }
}

#[async_trait]
impl PredictionTransport for HttpPredictionTransport {
    async fn send(&self, request: &PredictionRequest) -> Result<String, TransportError> {
        let form = Self::build_form(request)?;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(TransportError::EmptyBody);
        }
        Ok(body)
    }
}
