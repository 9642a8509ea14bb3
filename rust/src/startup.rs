use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config_store::ConfigStore;
use crate::keyword_store::KeywordStore;
use crate::path_utils::{get_base_dir, resolve_config_path};
use crate::server::{AppServer, AppState};
use crate::translations::TranslationTable;

#[derive(Debug, Default)]
pub struct Args {
    pub config: Option<String>,
}

pub fn parse_args<I>(args: I) -> Args
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(value) = args.next() {
                config = Some(value);
            }
        } else if let Some(value) = arg.strip_prefix("--config=") {
            config = Some(value.to_string());
        }
    }

    Args { config }
}

/// Loads config, translations and keyword store, then starts the server.
pub fn start_server() -> Result<AppServer> {
    let args = parse_args(env::args().skip(1));
    let base_dir = get_base_dir();
    let config_path = resolve_config_path(args.config, &base_dir);

    let config = ConfigStore::new(config_path.clone())
        .with_context(|| format!("config error: {}", config_path.display()))?;
    let preferred_port = config.server_port();
    let data_dir = config.data_dir(&base_dir);
    info!(
        config = %config_path.display(),
        data = %data_dir.display(),
        "starting prompt builder"
    );

    let translations_path = data_dir.join("translations.json");
    let translations = TranslationTable::load(&translations_path).unwrap_or_else(|err| {
        warn!("{err:#}; using builtin English texts");
        TranslationTable::builtin()
    });

    let keywords = KeywordStore::new(data_dir);
    let state = Arc::new(AppState::new(config, translations, keywords));
    AppServer::start(state, preferred_port).context("failed to start prompt server")
}
