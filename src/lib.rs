pub mod auth;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod scan;
pub mod templates_structs;
pub mod upi;
pub mod view;
