pub mod config;
pub mod password;
