// Library half of the backend: the server pieces, plus the HTTP client and
// smoke runner so integration tests and the `smoke` binary can share them.
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod items;
pub mod smoke;
pub mod web_server;
