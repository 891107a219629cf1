pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod report;
pub mod session;
#[cfg(test)]
pub mod test_helpers;
