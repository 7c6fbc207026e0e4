use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use slotkeeper_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

/// Where each effective value could have come from, lowest precedence last.
struct ConfigSources {
    file_path: Option<PathBuf>,
    file_doc: Option<Value>,
}

impl ConfigSources {
    fn source(&self, key_path: &str, env_keys: &[&str], overridden: bool) -> String {
        if overridden {
            return "override (command line)".to_string();
        }

        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: LoadOptions) -> String {
    let file_path = resolve_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let sources =
        ConfigSources { file_doc: load_config_file_doc(file_path.as_deref()), file_path };

    let fields: [(&str, String, &[&str], bool); 7] = [
        (
            "database.url",
            config.database.url.clone(),
            &["SLOTKEEPER_DATABASE_URL"],
            overrides.database_url.is_some(),
        ),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SLOTKEEPER_DATABASE_MAX_CONNECTIONS"],
            false,
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SLOTKEEPER_DATABASE_TIMEOUT_SECS"],
            false,
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SLOTKEEPER_LOGGING_LEVEL", "SLOTKEEPER_LOG_LEVEL"],
            overrides.log_level.is_some(),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SLOTKEEPER_LOGGING_FORMAT", "SLOTKEEPER_LOG_FORMAT"],
            false,
        ),
        (
            "safety.require_delete_preview",
            config.safety.require_delete_preview.to_string(),
            &["SLOTKEEPER_SAFETY_REQUIRE_DELETE_PREVIEW"],
            overrides.require_delete_preview.is_some(),
        ),
        (
            "safety.deletion_plan_ttl_secs",
            config.safety.deletion_plan_ttl_secs.to_string(),
            &["SLOTKEEPER_SAFETY_DELETION_PLAN_TTL_SECS"],
            false,
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for (key_path, value, env_keys, overridden) in fields {
        let source = sources.source(key_path, env_keys, overridden);
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
