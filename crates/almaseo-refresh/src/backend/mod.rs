//! Status backends.
//!
//! The guard only knows the [`StatusBackend`] trait. The HTTP implementation
//! keeps all status-code knowledge inside `http.rs`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RefreshResult;
use crate::types::{EntitySnapshot, StatusRequest, StatusSnapshot};

mod http;

pub use http::{HttpStatusBackend, REFRESH_TOKEN_HEADER, USER_AGENT_VALUE};

/// Remote status service, keyed by post id, producing payloads of type `T`.
#[async_trait]
pub trait StatusBackend<T: EntitySnapshot = StatusSnapshot>: Send + Sync + 'static {
    async fn fetch_status(&self, request: &StatusRequest) -> RefreshResult<T>;
}

#[async_trait]
impl<T, B> StatusBackend<T> for Arc<B>
where
    T: EntitySnapshot,
    B: StatusBackend<T> + ?Sized,
{
    async fn fetch_status(&self, request: &StatusRequest) -> RefreshResult<T> {
        (**self).fetch_status(request).await
    }
}
