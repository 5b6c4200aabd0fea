//! HTTP surface: the `/user` routes, their extractors and DTOs, and the
//! request-id / logging / error-rendering middleware.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
