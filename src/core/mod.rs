pub mod config;
pub mod jwt_auth;
pub mod policy;
mod responses;
mod telementry;
pub mod utils;

pub use self::config::AppConfig;
pub use responses::*;
pub use telementry::*;
