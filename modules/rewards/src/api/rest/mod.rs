pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod problem;
pub mod routes;
pub mod sse;
pub mod sse_adapter;
