use std::{cell::RefCell, collections::HashMap};

use super::{ApiError, Transport};

/// Serves canned bodies by exact URL and records every request. Unknown URLs
/// answer 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: HashMap<String, (u16, String)>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn with(self, url: &str, body: &str) -> Self {
        self.with_status(url, 200, body)
    }

    pub fn with_status(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(url.to_owned(), (status, body.to_owned()));
        self
    }

    pub fn count(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == url).count()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<String, ApiError> {
        self.calls.borrow_mut().push(url.to_owned());
        match self.routes.get(url) {
            Some((200, body)) => Ok(body.clone()),
            Some((status, body)) => Err(ApiError::Status {
                url: url.to_owned(),
                status: *status,
                body: body.clone(),
            }),
            None => Err(ApiError::Status {
                url: url.to_owned(),
                status: 404,
                body: r#"{"code":5,"message":"not found"}"#.to_owned(),
            }),
        }
    }
}
