pub mod http;

pub use http::HttpNluClient;
