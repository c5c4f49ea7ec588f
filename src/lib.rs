pub mod achievement_web_server;
pub mod core;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod testing;
