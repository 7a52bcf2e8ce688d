//! CLI subcommands.

pub mod config;
pub mod extract;
pub mod run;

use std::path::{Path, PathBuf};

use docfill_core::models::config::{DocfillConfig, OcrPolicy};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docfill")
        .join("config.json")
}

/// Load the configuration named on the command line, falling back to the
/// default file, then to built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<DocfillConfig> {
    if let Some(path) = config_path {
        return Ok(DocfillConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        Ok(DocfillConfig::from_file(&default_path)?)
    } else {
        Ok(DocfillConfig::default())
    }
}

/// OCR policy as a command-line value.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OcrArg {
    /// OCR only when native text is too short
    Auto,
    /// Always OCR page-based documents
    Always,
    /// Never run OCR
    Never,
}

impl From<OcrArg> for OcrPolicy {
    fn from(arg: OcrArg) -> Self {
        match arg {
            OcrArg::Auto => OcrPolicy::Auto,
            OcrArg::Always => OcrPolicy::Always,
            OcrArg::Never => OcrPolicy::Never,
        }
    }
}
