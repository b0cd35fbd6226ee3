//! Service configuration.
//!
//! Read once at startup from the environment (and `.env` when present).
//! Template and output locations are fixed relative paths.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::print::{DisabledConverter, LibreOfficeConverter, PrintConverter, CONVERSION_TIMEOUT, DEFAULT_CONVERTER};
use crate::templates::TEMPLATE_FILENAME;

pub const DEFAULT_PORT: u16 = 5000;
pub const UPLOAD_DIR: &str = "uploads";
pub const OUTPUT_DIR: &str = "output";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT value '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// `APP_ENV=production`, or `FLASK_ENV=production` when `APP_ENV` is unset.
    pub production: bool,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    /// Converter command line; None disables PDF generation.
    pub converter: Option<String>,
    pub conversion_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let production = lookup("APP_ENV")
            .or_else(|| lookup("FLASK_ENV"))
            .map_or(false, |v| v.trim() == "production");

        let converter = match lookup("CONTRATOS_CONVERTER") {
            None => Some(DEFAULT_CONVERTER.to_string()),
            Some(cmd) if cmd.trim().is_empty() || cmd.trim() == "none" => None,
            Some(cmd) => Some(cmd.trim().to_string()),
        };

        Ok(Self {
            port,
            production,
            template_path: PathBuf::from(UPLOAD_DIR).join(TEMPLATE_FILENAME),
            output_dir: PathBuf::from(OUTPUT_DIR),
            converter,
            conversion_timeout: CONVERSION_TIMEOUT,
        })
    }

    /// Create the upload and output directories.
    pub fn prepare_dirs(&self) -> io::Result<()> {
        if let Some(parent) = self.template_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.output_dir)
    }

    pub fn build_converter(&self) -> Arc<dyn PrintConverter> {
        match self
            .converter
            .as_deref()
            .and_then(LibreOfficeConverter::from_command_line)
        {
            Some(converter) => Arc::new(converter.with_timeout(self.conversion_timeout)),
            None => Arc::new(DisabledConverter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert!(!config.production);
        assert_eq!(config.template_path, PathBuf::from("uploads/contrato_base.docx"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.converter.as_deref(), Some("libreoffice"));
        assert_eq!(config.conversion_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_port_and_mode() {
        let config = config_from(&[("PORT", "8080"), ("APP_ENV", "production")]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.production);

        let config = config_from(&[("APP_ENV", "development")]).unwrap();
        assert!(!config.production);
    }

    #[test]
    fn test_legacy_mode_variable() {
        assert!(config_from(&[("FLASK_ENV", "production")]).unwrap().production);
        assert!(!config_from(&[("APP_ENV", "development"), ("FLASK_ENV", "production")])
            .unwrap()
            .production);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(ref v) if v == "http"));
    }

    #[test]
    fn test_converter_can_be_disabled() {
        assert_eq!(config_from(&[("CONTRATOS_CONVERTER", "none")]).unwrap().converter, None);
        assert_eq!(config_from(&[("CONTRATOS_CONVERTER", "")]).unwrap().converter, None);
        assert_eq!(
            config_from(&[("CONTRATOS_CONVERTER", "soffice")]).unwrap().converter.as_deref(),
            Some("soffice")
        );
    }
}
