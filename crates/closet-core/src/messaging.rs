use std::future::Future;

use thiserror::Error;

use crate::messages::{Request, Response};

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("background context is not accepting messages")]
    Disconnected,

    #[error("background context dropped the reply to '{action}'")]
    NoReply { action: &'static str },
}

/// Request/response channel from the page to the background context.
///
/// Every request resolves to a [`Response`] or an explicit error; a reply is
/// never silently lost.
pub trait Messenger {
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, MessagingError>>;
}
