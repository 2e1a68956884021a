pub mod concurrency;
pub mod error;
pub mod paths;
pub mod settings;

pub use concurrency::{
    max_concurrency_from_env, parse_concurrency, resolve_max_concurrency,
    DEFAULT_MAX_CONCURRENT_DOWNLOADS, MAX_CONCURRENT_DOWNLOADS, MAX_CONCURRENT_DOWNLOADS_ENV,
};
pub use error::ConfigError;
pub use paths::{default_config_path, DEFAULT_OUTPUT_DIR, GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR};
pub use settings::{parse_repository, Settings, DEFAULT_GITHUB_API_BASE};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn settings_yaml_fills_defaults() {
        let settings: Settings = serde_yaml::from_str(
            r#"
repository: octo/widgets
"#,
        )
        .expect("parse settings");

        assert_eq!(settings.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(settings.log_to_file);
        assert!(!settings.verbose);
        settings.validate().expect("valid settings");
    }

    #[test]
    fn settings_validation_rejects_out_of_range_concurrency() {
        let settings: Settings = serde_yaml::from_str(
            r#"
max_concurrent_downloads: 0
"#,
        )
        .expect("parse settings");

        let err = settings.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("between 1 and 100"));
    }

    #[test]
    fn load_or_default_handles_missing_file() {
        let dir = tempdir().expect("tempdir");
        let settings =
            Settings::load_or_default(&dir.path().join("absent.yaml")).expect("defaults");
        assert_eq!(settings.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn load_or_default_reports_invalid_yaml_with_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "output_dir: [unterminated").expect("write config");

        let err = Settings::load_or_default(&path).expect_err("parse should fail");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn default_config_path_uses_home_runscope() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let dir = tempdir().expect("temp dir");
        let old_home = std::env::var_os("HOME");
        std::env::set_var("HOME", dir.path());

        let path = default_config_path().expect("resolve config path");
        assert_eq!(path, dir.path().join(".runscope/config.yaml"));

        if let Some(value) = old_home {
            std::env::set_var("HOME", value);
        } else {
            std::env::remove_var("HOME");
        }
    }
}
