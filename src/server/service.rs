use super::request::{parse_request, RequestError};
use super::response::{write_request_error, write_response};
use crate::dispatcher::Dispatcher;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// `may_minihttp` service that hands every request to a [`Dispatcher`].
///
/// The body cap is taken from the dispatcher and enforced against the declared
/// `Content-Length` before the body is read.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: Option<usize>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let max_body_bytes = dispatcher.max_body_bytes();
        Self {
            dispatcher,
            max_body_bytes,
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        match parse_request(req, self.max_body_bytes) {
            Ok(raw) => {
                let response = self.dispatcher.dispatch(&raw);
                write_response(res, &response);
                Ok(())
            }
            Err(RequestError::Io(e)) => {
                debug!(error = %e, "Failed to read request body");
                Err(e)
            }
            Err(err) => {
                warn!(error = %err, code = err.code(), "Rejected request before dispatch");
                write_request_error(res, err.status().unwrap_or(400), &err);
                Ok(())
            }
        }
    }
}
