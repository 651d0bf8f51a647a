use reqwest::Method;
use reqwest::blocking::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("API {method} {path} failed: {status} {body}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        body: String,
    },
    #[error("API {method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API {method} {path} returned an unexpected body: {source}")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("request body could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Thin JSON-over-HTTP adapter. Every call is a single attempt: no retries
/// and no timeout, failures go back to the caller.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self, RequestError> {
        let client = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|source| RequestError::Transport {
                method: Method::GET,
                path: String::new(),
                source,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.request(Method::GET, path, None)
    }

    pub fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RequestError> {
        let body = body.map(serde_json::to_vec).transpose()?;
        self.request(Method::POST, path, body)
    }

    pub fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RequestError> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::PATCH, path, Some(body))
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, RequestError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let transport = |source: reqwest::Error| RequestError::Transport {
            method: method.clone(),
            path: path.to_string(),
            source,
        };

        tracing::debug!(%method, path, "request");
        let response = builder.send().map_err(&transport)?;
        let status = response.status();
        let text = response.text().map_err(&transport)?;

        if !status.is_success() {
            return Err(RequestError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|source| RequestError::Decode {
            method,
            path: path.to_string(),
            source,
        })
    }
}
