//! Fetch Module - The single outbound HTTP primitive
//!
//! Every provider routes its calls through `FetchClient` so retry and
//! timeout policy stays uniform.
//!
//! # Components
//! - `types.rs`: `FetchRequest`, `FetchResponse`, `FetchError`
//! - `client.rs`: retrying client on top of `reqwest`
//! - `decode.rs`: content-type driven body decoding (JSON, XML, text)

pub mod client;
pub mod decode;
pub mod types;

pub use client::{FetchClient, FetchConfig};
pub use types::{FetchError, FetchRequest, FetchResponse};
