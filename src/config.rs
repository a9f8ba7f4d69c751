//! Configuration for the `epubinfo` binary

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// EPUB to inspect
    pub path: Option<PathBuf>,
    pub format: OutputFormat,
    /// Where to write the cover image, if anywhere
    pub cover_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Pretty,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            path: None,
            format: OutputFormat::Pretty,
            cover_output: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            path: env::var_os("EPUBINFO_PATH").map(PathBuf::from),
            format: env::var("EPUBINFO_FORMAT")
                .map(|v| OutputFormat::parse(&v))
                .unwrap_or(OutputFormat::Pretty),
            cover_output: env::var_os("EPUBINFO_COVER").map(PathBuf::from),
        }
    }

    /// Apply command line arguments: `[path]`
    pub fn with_args<I: IntoIterator<Item = String>>(mut self, args: I) -> Self {
        if let Some(path) = args.into_iter().next() {
            self.path = Some(PathBuf::from(path));
        }
        self
    }
}
