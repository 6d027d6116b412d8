//! Thin typed wrappers around the backend microservice endpoints. Each API
//! borrows a memoized [`ServiceClient`](crate::http::ServiceClient) pipeline
//! and describes only the wire shape of its calls.

pub mod auth;
pub mod sso;
