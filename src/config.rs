use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Defaults that can be saved to an rc file and merged with the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub no_sidebar: bool,
    pub outline_levels: Option<usize>,
    pub content_root: Option<String>,
    pub index: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: switches accumulate, values from `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            no_sidebar: self.no_sidebar || other.no_sidebar,
            outline_levels: other.outline_levels.or(self.outline_levels),
            content_root: other
                .content_root
                .clone()
                .or_else(|| self.content_root.clone()),
            index: other.index.clone().or_else(|| self.index.clone()),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("docshelf").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("docshelf")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("docshelf").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("docshelf")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".docshelfrc")
}

/// Read flags from an rc file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` to `path`, one flag per line.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# docshelf defaults (saved with --save)".to_string());
    if flags.no_sidebar {
        lines.push("--no-sidebar".to_string());
    }
    if let Some(levels) = flags.outline_levels {
        lines.push(format!("--outline-levels {levels}"));
    }
    if let Some(root) = &flags.content_root {
        lines.push(format!("--content-root {root}"));
    }
    if let Some(index) = &flags.index {
        lines.push(format!("--index {index}"));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove a saved rc file, if any.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of raw tokens, ignoring everything else.
///
/// Value flags accept both `--flag value` and `--flag=value`.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--no-sidebar" {
            flags.no_sidebar = true;
        } else if let Some((name, inline)) = value_flag(token) {
            let value = match inline {
                Some(value) => Some(value.to_string()),
                None => {
                    i += 1;
                    tokens.get(i).cloned()
                }
            };
            if let Some(value) = value {
                apply_value(&mut flags, name, value);
            }
        }
        i += 1;
    }
    flags
}

const VALUE_FLAGS: &[&str] = &["--outline-levels", "--content-root", "--index", "--log-file"];

fn value_flag(token: &str) -> Option<(&'static str, Option<&str>)> {
    VALUE_FLAGS.iter().find_map(|&name| {
        if token == name {
            Some((name, None))
        } else {
            token
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|value| (name, Some(value)))
        }
    })
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: String) {
    match name {
        "--outline-levels" => flags.outline_levels = value.parse().ok(),
        "--content-root" => flags.content_root = Some(value),
        "--index" => flags.index = Some(value),
        "--log-file" => flags.log_file = Some(PathBuf::from(value)),
        _ => {}
    }
}
