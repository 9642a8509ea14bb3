use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::DEFAULT_LANGUAGE;

const BUILTIN_TEXTS: [(&str, &str); 14] = [
    ("language_name", "English"),
    ("title", "Prompt Builder"),
    ("prompt_placeholder", "Your prompt will appear here..."),
    ("select", "Select"),
    ("copy_prompt", "Copy Prompt"),
    ("clear_prompt", "Clear Prompt"),
    ("undo", "Undo"),
    ("redo", "Redo"),
    ("random_prompt", "Random Prompt"),
    ("prompt_copied", "Prompt copied to clipboard!"),
    ("nothing_to_copy", "The prompt is empty."),
    ("nothing_to_undo", "Nothing to undo."),
    ("nothing_to_redo", "Nothing to redo."),
    ("nothing_to_clear", "The prompt is already empty."),
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LanguageOption {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TranslationTable {
    languages: Vec<(String, BTreeMap<String, String>)>,
}

impl TranslationTable {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read translations: {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid translations: {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text).context("failed to parse translation JSON")?;
        let Some(object) = doc.as_object() else {
            return Err(anyhow!("translation file must be a JSON object"));
        };

        let mut languages = Vec::new();
        for (code, entries) in object {
            let Some(entries) = entries.as_object() else {
                continue;
            };
            let texts = entries
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect();
            languages.push((code.trim().to_string(), texts));
        }

        Ok(Self { languages })
    }

    pub fn builtin() -> Self {
        Self {
            languages: vec![(DEFAULT_LANGUAGE.to_string(), builtin_texts())],
        }
    }

    pub fn languages(&self) -> Vec<LanguageOption> {
        self.languages
            .iter()
            .map(|(code, texts)| LanguageOption {
                code: code.clone(),
                name: texts
                    .get("language_name")
                    .cloned()
                    .unwrap_or_else(|| code.clone()),
            })
            .collect()
    }

    pub fn has_language(&self, lang: &str) -> bool {
        self.table(lang).is_some()
    }

    pub fn resolve_language(&self, requested: &str) -> String {
        let requested = requested.trim();
        if self.has_language(requested) {
            return requested.to_string();
        }
        if self.has_language(DEFAULT_LANGUAGE) {
            return DEFAULT_LANGUAGE.to_string();
        }
        self.languages
            .first()
            .map(|(code, _)| code.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    /// Full text table for `lang`: builtin keys, then the default language,
    /// then the language's own entries.
    pub fn texts(&self, lang: &str) -> BTreeMap<String, String> {
        let mut texts = builtin_texts();
        if let Some(default) = self.table(DEFAULT_LANGUAGE) {
            texts.extend(default.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if lang != DEFAULT_LANGUAGE {
            if let Some(own) = self.table(lang) {
                texts.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        texts
    }

    pub fn text(&self, lang: &str, key: &str) -> String {
        [lang, DEFAULT_LANGUAGE]
            .into_iter()
            .find_map(|code| self.table(code).and_then(|t| t.get(key)).cloned())
            .or_else(|| {
                BUILTIN_TEXTS
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (*v).to_string())
            })
            .unwrap_or_else(|| key.to_string())
    }

    fn table(&self, lang: &str) -> Option<&BTreeMap<String, String>> {
        self.languages
            .iter()
            .find(|(code, _)| code == lang)
            .map(|(_, texts)| texts)
    }
}

fn builtin_texts() -> BTreeMap<String, String> {
    BUILTIN_TEXTS
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
