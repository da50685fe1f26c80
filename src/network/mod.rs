pub mod client;
pub mod transport;

pub use client::{FetchOutcome, NetworkClient, PostOutcome};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, InMemoryTransport, ReqwestTransport,
};
