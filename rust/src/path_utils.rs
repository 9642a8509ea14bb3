use std::env;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory the app treats as home: the executable's directory when it
/// holds a config or data dir, else the working directory when that does.
pub fn get_base_dir() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if looks_like_base_dir(&exe_dir) {
        return exe_dir;
    }

    if let Ok(cwd) = env::current_dir() {
        if looks_like_base_dir(&cwd) {
            return cwd;
        }
    }

    exe_dir
}

pub fn resolve_config_path(raw: Option<String>, base_dir: &Path) -> PathBuf {
    if let Some(path) = raw {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return path;
        }
        if let Ok(cwd) = env::current_dir() {
            return cwd.join(path);
        }
        return path;
    }

    let candidates = [
        base_dir.join(CONFIG_FILE_NAME),
        base_dir.join("config").join(CONFIG_FILE_NAME),
    ];
    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    base_dir.join(CONFIG_FILE_NAME)
}

fn looks_like_base_dir(dir: &Path) -> bool {
    dir.join(CONFIG_FILE_NAME).exists()
        || dir.join("config").join(CONFIG_FILE_NAME).exists()
        || dir.join("data").join("translations.json").exists()
}

#[cfg(test)]
mod tests {
    use super::resolve_config_path;
    use std::fs;

    #[test]
    fn prefers_nested_config_when_root_is_missing() {
        let mut base = std::env::temp_dir();
        base.push(format!("prompt_builder_paths_test_{}", std::process::id()));
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(base.join("config")).expect("mkdir fixture");

        assert_eq!(resolve_config_path(None, &base), base.join("config.toml"));

        fs::write(base.join("config").join("config.toml"), "").expect("fixture write");
        assert_eq!(
            resolve_config_path(None, &base),
            base.join("config").join("config.toml")
        );

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn explicit_absolute_path_wins() {
        let explicit = std::env::temp_dir().join("elsewhere.toml");
        let resolved = resolve_config_path(
            Some(explicit.to_string_lossy().into_owned()),
            std::path::Path::new("/unused"),
        );
        assert_eq!(resolved, explicit);
    }
}
