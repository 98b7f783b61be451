use crate::fetch::{FetchError, RemoteSource};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::HashMap;

enum Response {
    Body(String),
    Status(StatusCode),
}

/// In-memory stand-in for the artifact host. Unknown URLs are 404s.
#[derive(Default)]
pub struct MemorySource {
    responses: HashMap<String, Response>,
    requests: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), Response::Body(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: StatusCode) -> Self {
        self.responses
            .insert(url.to_string(), Response::Status(status));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl RemoteSource for MemorySource {
    fn get(&self, url: &str) -> Result<Option<String>, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.responses.get(url) {
            Some(Response::Body(body)) => Ok(Some(body.clone())),
            Some(Response::Status(status)) if *status == StatusCode::NOT_FOUND => Ok(None),
            Some(Response::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Ok(None),
        }
    }
}
