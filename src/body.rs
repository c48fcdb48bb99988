//! Inbound request body buffering.
//!
//! The payload hash covers the whole body, so proxied bodies are read fully into memory before
//! signing. Streaming bodies are not supported.
use {bytes::Bytes, std::future::Future, tower::BoxError};

/// A request body that can be buffered into a single [`Bytes`] value.
pub trait IntoRequestBytes {
    /// Read the whole body into memory.
    fn into_request_bytes(self) -> impl Future<Output = Result<Bytes, BoxError>> + Send + Sync;
}

/// The unit type is an empty body.
impl IntoRequestBytes for () {
    async fn into_request_bytes(self) -> Result<Bytes, BoxError> {
        Ok(Bytes::new())
    }
}

impl IntoRequestBytes for Vec<u8> {
    async fn into_request_bytes(self) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(self))
    }
}

/// Already buffered; returned as-is.
impl IntoRequestBytes for Bytes {
    async fn into_request_bytes(self) -> Result<Bytes, BoxError> {
        Ok(self)
    }
}

impl IntoRequestBytes for String {
    async fn into_request_bytes(self) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(self))
    }
}

impl IntoRequestBytes for &'static str {
    async fn into_request_bytes(self) -> Result<Bytes, BoxError> {
        Ok(Bytes::from_static(self.as_bytes()))
    }
}
