pub mod client;
pub mod error;
pub mod model;

pub use client::RewardsApi;
pub use error::RewardsError;
pub use model::*;
