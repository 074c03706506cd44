pub mod analytics;
pub mod errors;
pub mod health;
