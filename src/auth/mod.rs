pub mod client;
pub mod credentials;
pub mod login;
pub mod qr;

pub use client::{ApiClient, AuthRequestBuilder, HttpTransport, Transport};
pub use credentials::CredentialStore;
