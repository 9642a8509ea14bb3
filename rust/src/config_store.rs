use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use toml::map::Map;
use toml::Value;
use tracing::info;

use crate::keyword_store::is_valid_language_code;
use crate::session_store::SessionStore;
use crate::DEFAULT_LANGUAGE;

const DEFAULT_SERVER_PORT: i64 = 3000;
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug)]
pub struct ConfigStore {
    pub path: PathBuf,
    doc: Value,
}

impl ConfigStore {
    /// Loads `path`, creating it with defaults when it does not exist yet.
    /// The normalised document is written back so the file always lists
    /// every setting.
    pub fn new(path: PathBuf) -> Result<Self> {
        let doc: Value = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse TOML: {}", path.display()))?
        } else {
            info!("creating default config at {}", path.display());
            Value::Table(Map::new())
        };

        let mut store = Self { path, doc };
        store.normalize_doc();
        store.save()?;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(&self.doc).context("failed to serialize TOML")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write config: {}", self.path.display()))
    }

    pub fn language(&self) -> String {
        self.app_table()
            .and_then(|t| t.get("language"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| is_valid_language_code(v))
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string()
    }

    pub fn set_language(&mut self, lang: &str) -> Result<()> {
        let lang = lang.trim();
        if !is_valid_language_code(lang) {
            return Err(anyhow!("invalid language code: {lang:?}"));
        }
        if self.language() == lang {
            return Ok(());
        }

        self.ensure_app_table_mut()
            .insert("language".to_string(), Value::String(lang.to_string()));
        self.save()?;
        info!(lang, "interface language saved");
        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.app_table()
            .and_then(|t| t.get("server_port"))
            .and_then(value_to_i64)
            .and_then(|v| u16::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_SERVER_PORT as u16)
    }

    /// Directory holding `translations.json` and the keyword files. Relative
    /// paths resolve against `base_dir`.
    pub fn data_dir(&self, base_dir: &Path) -> PathBuf {
        let raw = self
            .app_table()
            .and_then(|t| t.get("data_dir"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_DATA_DIR);

        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.app_table()
            .and_then(|t| t.get("max_sessions"))
            .and_then(value_to_i64)
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(SessionStore::DEFAULT_MAX_SESSIONS)
    }

    fn normalize_doc(&mut self) {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }

        let language = self.language();
        let app = self.ensure_app_table_mut();

        app.insert("language".to_string(), Value::String(language));

        let port = app
            .get("server_port")
            .and_then(value_to_i64)
            .filter(|v| (1..=65_535).contains(v))
            .unwrap_or(DEFAULT_SERVER_PORT);
        app.insert("server_port".to_string(), Value::Integer(port));

        let data_dir = app
            .get("data_dir")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_DATA_DIR)
            .to_string();
        app.insert("data_dir".to_string(), Value::String(data_dir));

        let max_sessions = app
            .get("max_sessions")
            .and_then(value_to_i64)
            .filter(|v| *v > 0)
            .unwrap_or(SessionStore::DEFAULT_MAX_SESSIONS as i64);
        app.insert("max_sessions".to_string(), Value::Integer(max_sessions));
    }

    fn app_table(&self) -> Option<&Map<String, Value>> {
        self.doc
            .as_table()
            .and_then(|root| root.get("app"))
            .and_then(Value::as_table)
    }

    fn ensure_app_table_mut(&mut self) -> &mut Map<String, Value> {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }
        let root = self
            .doc
            .as_table_mut()
            .expect("root should be table after normalization");
        let app = root
            .entry("app".to_string())
            .or_insert_with(|| Value::Table(Map::new()));
        if !app.is_table() {
            *app = Value::Table(Map::new());
        }
        app.as_table_mut()
            .expect("app should be table after normalization")
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    value
        .as_integer()
        .or_else(|| value.as_float().map(|v| v as i64))
        .or_else(|| value.as_str().and_then(|v| v.trim().parse::<i64>().ok()))
}
