pub mod prelude;

pub mod audit_log;
pub mod controllers;
pub mod readings;
pub mod user_controllers;
pub mod users;
