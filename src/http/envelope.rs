use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ClientError;

/// Uniform wrapper carried by every structured backend response, regardless
/// of the transport status code. `status == 200` is the sole success
/// discriminator.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub status: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
    /// Pagination metadata, present on paged endpoints only.
    #[serde(default)]
    pub page: Option<Value>,
}

/// Unwrapped response handed back to feature code.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    Data(Value),
    Paged { data: Value, page: Value },
    /// Binary bodies (blob downloads) bypass the envelope entirely.
    Binary(Vec<u8>),
}

impl ApiEnvelope {
    pub fn unwrap(self) -> Result<ApiResponse, ClientError> {
        if self.status == 200 {
            return Ok(match self.page {
                Some(page) => ApiResponse::Paged { data: self.data, page },
                None => ApiResponse::Data(self.data),
            });
        }

        let message = self
            .message
            .unwrap_or_else(|| "request failed".to_string());
        tracing::error!(status = self.status, "application error: {message}");
        Err(ClientError::Api { status: self.status, message })
    }
}

impl ApiResponse {
    /// The `data` field of the envelope; `Null` for binary responses.
    pub fn into_data(self) -> Value {
        match self {
            ApiResponse::Data(data) | ApiResponse::Paged { data, .. } => data,
            ApiResponse::Binary(_) => Value::Null,
        }
    }

    pub fn page(&self) -> Option<&Value> {
        match self {
            ApiResponse::Paged { page, .. } => Some(page),
            _ => None,
        }
    }

    /// Deserialize the `data` field into a typed value.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        Ok(serde_json::from_value(self.into_data())?)
    }
}
