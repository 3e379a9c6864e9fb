use crate::sheets::{CsvWorkbook, GoogleSheets, SheetGateway};
use anyhow::{bail, Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Where results are read from and written to. Shared by all binaries.
#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// Google spreadsheet id
    #[clap(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Service account key: the JSON itself or a path to the key file
    #[clap(long, env = "GOOGLE_SHEETS_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,

    /// Use a directory of CSV files instead of Google Sheets
    #[clap(long, env = "LOCAL_WORKBOOK_DIR")]
    pub local_dir: Option<PathBuf>,

    /// Maximum number of properties to process (default: all)
    #[clap(short = 'i', long)]
    pub max_items: Option<usize>,

    /// Enable debug output
    #[clap(short, long)]
    pub debug: bool,
}

impl SheetArgs {
    pub fn open_gateway(&self) -> Result<Box<dyn SheetGateway>> {
        if let Some(dir) = &self.local_dir {
            info!("Using local workbook at {}", dir.display());
            return Ok(Box::new(CsvWorkbook::open(dir)?));
        }

        let Some(spreadsheet_id) = self.spreadsheet_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            bail!("SPREADSHEET_ID is not set");
        };
        let Some(credentials) = self.credentials.as_deref().filter(|c| !c.trim().is_empty()) else {
            bail!("GOOGLE_SHEETS_CREDENTIALS is not set");
        };

        let credentials = if credentials.trim_start().starts_with('{') {
            credentials.to_string()
        } else {
            fs::read_to_string(credentials)
                .with_context(|| format!("Failed to read credentials file: {}", credentials))?
        };

        Ok(Box::new(GoogleSheets::from_credentials_json(spreadsheet_id, &credentials)?))
    }

    /// Progress bars only make sense when per-request logging is off.
    pub fn show_progress(&self) -> bool {
        !self.debug
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over `--debug`.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SheetArgs {
        SheetArgs {
            spreadsheet_id: None,
            credentials: None,
            local_dir: None,
            max_items: None,
            debug: false,
        }
    }

    #[test]
    fn missing_spreadsheet_id_is_fatal() {
        let err = args().open_gateway().err().unwrap();
        assert!(err.to_string().contains("SPREADSHEET_ID"));
    }

    #[test]
    fn missing_credentials_is_fatal() {
        let err = SheetArgs {
            spreadsheet_id: Some("abc".into()),
            ..args()
        }
        .open_gateway()
        .err()
        .unwrap();
        assert!(err.to_string().contains("GOOGLE_SHEETS_CREDENTIALS"));
    }

    #[test]
    fn local_dir_needs_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = SheetArgs {
            local_dir: Some(dir.path().to_path_buf()),
            ..args()
        }
        .open_gateway()
        .unwrap();
        assert!(gateway.name().starts_with("csv:"));
    }
}
