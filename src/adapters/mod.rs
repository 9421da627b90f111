pub mod credentials;
pub mod sessions_http;
