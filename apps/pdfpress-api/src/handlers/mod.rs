//! HTTP handlers

pub mod compression;
