//! HTTP control surface.

pub mod routes;

pub use routes::control_routes;
