mod api;
mod conn;
mod core;
mod session;
mod store;
mod util;

pub use api::make_app;
pub use core::Error;
pub use util::config::Config;
