pub mod config_store;
pub mod keyword_store;
pub mod logging;
pub mod main_ui_html;
pub mod path_utils;
pub mod prompt_history;
pub mod renderer;
pub mod server;
pub mod session_store;
pub mod startup;
pub mod translations;

pub const DEFAULT_LANGUAGE: &str = "en";
