use serde::Serialize;

use crate::keyword_store::KeywordSet;
use crate::prompt_history::PromptHistory;

#[derive(Debug, Clone, Serialize)]
pub struct SelectorRow {
    pub category: String,
    pub placeholder: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PromptView {
    pub prompt: String,
    pub can_undo: bool,
    pub can_redo: bool,
}

pub fn render_selectors(keywords: &KeywordSet, select_label: &str) -> Vec<SelectorRow> {
    keywords
        .categories()
        .iter()
        .map(|category| SelectorRow {
            category: category.name.clone(),
            placeholder: format!("{} {}", select_label.trim(), category.name)
                .trim()
                .to_string(),
            keywords: category.keywords.clone(),
        })
        .collect()
}

pub fn render_prompt(history: &PromptHistory) -> PromptView {
    PromptView {
        prompt: history.buffer().to_string(),
        can_undo: history.can_undo(),
        can_redo: history.can_redo(),
    }
}
