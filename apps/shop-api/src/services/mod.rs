//! Service layer: the operations behind each route, independent of HTTP.

pub mod bonus_processor;
pub mod bonus_service;
pub mod sale_service;
