pub mod api;
pub mod client;
pub mod config;
pub mod gateway;
pub mod live;
pub mod model;
pub mod provider;
pub mod query;
pub mod server;
pub mod synth;
