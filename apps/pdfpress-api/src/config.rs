//! Server configuration
//!
//! Read once at startup from the environment (optionally seeded from a `.env`
//! file) and passed explicitly to everything that needs it.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use pdfpress_domain::CompressionConfig;
use pdfpress_fs::StorageRoots;
use pdfpress_lopdf::RewriteOptions;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_OUTPUT_DIR: &str = "compressed";
const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 100 * 1024 * 1024;

/// Process-lifetime server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (`PDFPRESS_HOST`)
    pub host: String,
    /// Listen port (`PDFPRESS_PORT`)
    pub port: u16,
    /// Root for uploaded originals (`PDFPRESS_UPLOAD_DIR`)
    pub upload_dir: PathBuf,
    /// Root for rewritten documents (`PDFPRESS_OUTPUT_DIR`)
    pub output_dir: PathBuf,
    /// Largest accepted document (`PDFPRESS_MAX_DOCUMENT_BYTES`)
    pub max_document_bytes: u64,
    /// lopdf rewrite knobs (`PDFPRESS_COMPRESS_STREAMS`, `PDFPRESS_PRUNE_OBJECTS`)
    pub rewrite: RewriteOptions,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a value cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = RewriteOptions::default();

        let config = Self {
            host: lookup("PDFPRESS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&lookup, "PDFPRESS_PORT", DEFAULT_PORT)?,
            upload_dir: lookup("PDFPRESS_UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())
                .into(),
            output_dir: lookup("PDFPRESS_OUTPUT_DIR")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
                .into(),
            max_document_bytes: parse_var(
                &lookup,
                "PDFPRESS_MAX_DOCUMENT_BYTES",
                DEFAULT_MAX_DOCUMENT_BYTES,
            )?,
            rewrite: RewriteOptions {
                compress_streams: parse_flag(
                    &lookup,
                    "PDFPRESS_COMPRESS_STREAMS",
                    defaults.compress_streams,
                )?,
                prune_unreferenced: parse_flag(
                    &lookup,
                    "PDFPRESS_PRUNE_OBJECTS",
                    defaults.prune_unreferenced,
                )?,
            },
        };

        if config.max_document_bytes == 0 {
            bail!("PDFPRESS_MAX_DOCUMENT_BYTES must be greater than zero");
        }

        info!(
            host = %config.host,
            port = config.port,
            upload_dir = %config.upload_dir.display(),
            output_dir = %config.output_dir.display(),
            max_document_bytes = config.max_document_bytes,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// `host:port` to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Storage roots for the artifact store
    pub fn storage_roots(&self) -> StorageRoots {
        StorageRoots::new(&self.upload_dir, &self.output_dir)
    }

    /// Pipeline configuration for the compression service
    pub fn compression_config(&self) -> CompressionConfig {
        CompressionConfig {
            max_document_size: self.max_document_bytes,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("invalid value for {key}: {other:?} (expected true or false)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.output_dir, PathBuf::from("compressed"));
        assert_eq!(config.max_document_bytes, 100 * 1024 * 1024);
        assert_eq!(config.rewrite, RewriteOptions::default());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PDFPRESS_PORT", "8080"),
            ("PDFPRESS_UPLOAD_DIR", "/tmp/in"),
            ("PDFPRESS_MAX_DOCUMENT_BYTES", "2048"),
            ("PDFPRESS_PRUNE_OBJECTS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_roots().incoming, PathBuf::from("/tmp/in"));
        assert_eq!(config.compression_config().max_document_size, 2048);
        assert!(!config.rewrite.prune_unreferenced);
        assert!(config.rewrite.compress_streams);
    }

    #[test]
    fn test_invalid_port_names_variable() {
        let err = ServerConfig::from_lookup(lookup_from(&[("PDFPRESS_PORT", "eighty")]))
            .unwrap_err();

        assert!(err.to_string().contains("PDFPRESS_PORT"));
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let result =
            ServerConfig::from_lookup(lookup_from(&[("PDFPRESS_COMPRESS_STREAMS", "maybe")]));

        assert!(result.is_err());
    }

    #[test]
    fn test_zero_max_size_is_rejected() {
        let result =
            ServerConfig::from_lookup(lookup_from(&[("PDFPRESS_MAX_DOCUMENT_BYTES", "0")]));

        assert!(result.is_err());
    }
}
