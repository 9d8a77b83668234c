// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/kash/kash.toml` < `~/.config/kash/kash.toml` <
//! `./kash.toml` < explicit path < `KASH_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KashConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/kash/kash.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "kash.toml";

/// Config files consulted by [`load_config`], lowest priority first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("kash/kash.toml"));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG_PATH));
    paths
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<KashConfig, figment::Error> {
    build_figment(None).extract()
}

/// Load configuration from the hierarchy plus one explicit file, which
/// overrides every file in the hierarchy but not the environment.
pub fn load_config_from_path(path: &Path) -> Result<KashConfig, figment::Error> {
    build_figment(Some(path)).extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<KashConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KashConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Build the Figment used for config loading.
pub fn build_figment(explicit: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(KashConfig::default()));
    for path in config_file_paths() {
        figment = figment.merge(Toml::file(path));
    }
    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Maps `KASH_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `KASH_TELEGRAM_BOT_TOKEN` is `telegram.bot_token`.
fn env_provider() -> Env {
    Env::prefixed("KASH_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Rewrites an env key (prefix stripped, lowercased) into a dotted path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: &[&str] = &["agent", "telegram", "model", "history", "logging", "messages"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("model_timeout_secs"), "model.timeout_secs");
        assert_eq!(map_env_key("history_context_window"), "history.context_window");
        assert_eq!(map_env_key("messages_clear_button"), "messages.clear_button");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_provider_maps_uppercase_names() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("KASH_HISTORY_CONTEXT_WINDOW", "4");
            jail.set_env("KASH_TELEGRAM_BOT_TOKEN", "42:XYZ");

            let figment = figment::Figment::from(env_provider());
            let window: usize = figment.extract_inner("history.context_window")?;
            let token: String = figment.extract_inner("telegram.bot_token")?;
            assert_eq!(window, 4);
            assert_eq!(token, "42:XYZ");
            Ok(())
        });
    }

    #[test]
    fn local_file_has_highest_file_priority() {
        let paths = config_file_paths();
        assert_eq!(paths.first().unwrap(), Path::new(SYSTEM_CONFIG_PATH));
        assert_eq!(paths.last().unwrap(), Path::new(LOCAL_CONFIG_PATH));
    }
}
