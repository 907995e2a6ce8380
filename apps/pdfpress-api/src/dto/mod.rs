//! Request and response shapes for the OpenAPI document

pub mod compression;
