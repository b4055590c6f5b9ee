pub mod assignment;
pub mod audit;
pub mod controller;
pub mod reading;
pub mod user;
