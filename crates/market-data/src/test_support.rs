//! In-memory transport for provider tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::provider::{HttpFetch, HttpRequest};

enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

/// Replays canned responses, matched by URL substring, and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedFetch {
    routes: Vec<(String, Reply)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_part: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.push((url_part.to_string(), Reply::Body(body.into())));
        self
    }

    pub fn fail(mut self, url_part: &str, status: u16) -> Self {
        self.routes.push((url_part.to_string(), Reply::Status(status)));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpFetch for ScriptedFetch {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, MarketDataError> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .routes
            .iter()
            .find(|(part, _)| request.url.contains(part.as_str()))
            .map(|(_, reply)| reply);

        match reply {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(MarketDataError::HttpStatus {
                provider: request.provider.to_string(),
                status: *status,
            }),
            None => Err(MarketDataError::HttpStatus {
                provider: request.provider.to_string(),
                status: 404,
            }),
        }
    }
}
