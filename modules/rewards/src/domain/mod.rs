pub mod coupon;
pub mod error;
pub mod events;
pub mod level;
pub mod locks;
pub mod points;
pub mod ports;
pub mod repo;
pub mod service;
pub mod spin;
pub mod validation;
