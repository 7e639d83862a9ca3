//! Wire types shared by the Chirpy API handlers and the server binary.

pub mod api;
pub mod models;
