use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeywordCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Categories of one language, in file order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordSet {
    categories: Vec<KeywordCategory>,
}

impl KeywordSet {
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text).context("failed to parse keyword JSON")?;
        let Some(object) = doc.as_object() else {
            return Err(anyhow!("keyword file must be a JSON object"));
        };

        let mut categories = Vec::new();
        for (name, value) in object {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            categories.push(KeywordCategory {
                name: name.to_string(),
                keywords: normalize_keywords(value),
            });
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }

    pub fn lists(&self) -> impl Iterator<Item = &[String]> {
        self.categories.iter().map(|c| c.keywords.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|c| c.keywords.is_empty())
    }
}

/// Loads `keywords_<lang>.json` files from a data directory, caching each
/// language after its first read.
#[derive(Debug)]
pub struct KeywordStore {
    data_dir: PathBuf,
    cache: HashMap<String, KeywordSet>,
}

impl KeywordStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            cache: HashMap::new(),
        }
    }

    pub fn keywords(&mut self, lang: &str) -> Result<&KeywordSet> {
        if !is_valid_language_code(lang) {
            return Err(anyhow!("invalid language code: {lang:?}"));
        }

        if !self.cache.contains_key(lang) {
            let path = self.keyword_path(lang);
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read keywords: {}", path.display()))?;
            let set = KeywordSet::from_json(&text)
                .with_context(|| format!("invalid keyword file: {}", path.display()))?;
            info!(
                lang,
                categories = set.categories().len(),
                "loaded keywords from {}",
                path.display()
            );
            self.cache.insert(lang.to_string(), set);
        }

        self.cache
            .get(lang)
            .ok_or_else(|| anyhow!("keywords not cached for {lang}"))
    }

    pub fn reload(&mut self) {
        debug!(cached = self.cache.len(), "dropping keyword cache");
        self.cache.clear();
    }

    fn keyword_path(&self, lang: &str) -> PathBuf {
        self.data_dir.join(format!("keywords_{lang}.json"))
    }
}

pub fn is_valid_language_code(lang: &str) -> bool {
    !lang.is_empty()
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn normalize_keywords(value: &Value) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    if let Value::Array(items) = value {
        for item in items {
            let Some(text) = item.as_str().map(str::trim) else {
                continue;
            };
            if !text.is_empty() && !normalized.iter().any(|existing| existing == text) {
                normalized.push(text.to_string());
            }
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::{is_valid_language_code, KeywordSet, KeywordStore};
    use std::fs;
    use std::path::PathBuf;

    fn fixture_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "prompt_builder_keywords_test_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("mkdir fixture");
        dir
    }

    #[test]
    fn keeps_category_order_and_normalizes_keywords() {
        let set = KeywordSet::from_json(
            r#"{
                "Style": ["oil painting", " watercolor ", "", "oil painting", 3],
                "Animal": ["cat"],
                "Lighting": []
            }"#,
        )
        .expect("parse keywords");

        let names: Vec<&str> = set.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Style", "Animal", "Lighting"]);
        assert_eq!(set.categories()[0].keywords, vec!["oil painting", "watercolor"]);

        let lists: Vec<&[String]> = set.lists().collect();
        assert_eq!(lists.len(), 3);
        assert!(lists[2].is_empty());
        assert!(!set.is_empty());
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = KeywordSet::from_json(r#"["cat"]"#).expect_err("array should fail");
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn loads_and_caches_per_language() {
        let dir = fixture_dir("cache");
        fs::write(dir.join("keywords_en.json"), r#"{"Animal": ["cat", "dog"]}"#)
            .expect("fixture write");

        let mut store = KeywordStore::new(dir.clone());
        let first = store.keywords("en").expect("load en").categories().to_vec();
        assert_eq!(first[0].keywords, vec!["cat", "dog"]);

        fs::write(dir.join("keywords_en.json"), r#"{"Animal": ["owl"]}"#)
            .expect("fixture rewrite");
        let cached = store.keywords("en").expect("cached en");
        assert_eq!(cached.categories()[0].keywords, vec!["cat", "dog"]);

        store.reload();
        let reloaded = store.keywords("en").expect("reloaded en");
        assert_eq!(reloaded.categories()[0].keywords, vec!["owl"]);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = fixture_dir("missing");
        let mut store = KeywordStore::new(dir.clone());

        let err = store.keywords("fr").expect_err("missing file should fail");
        assert!(format!("{err:#}").contains("keywords_fr.json"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn language_codes_cannot_escape_data_dir() {
        assert!(is_valid_language_code("en"));
        assert!(is_valid_language_code("zh-CN"));
        assert!(!is_valid_language_code("../secret"));
        assert!(!is_valid_language_code(""));

        let mut store = KeywordStore::new(std::env::temp_dir());
        assert!(store.keywords("../x").is_err());
    }
}
