//! Configuration file management for ais-watch.
//!
//! Reads/writes `~/.ais-watch/config.yaml` with the external decoder
//! settings and the KML export directory.

use std::path::PathBuf;

use crate::types::AisError;

/// Default TCP port aisdeco serves sentences on.
pub const DEFAULT_PORT: u16 = 1369;

/// AIS channels 87B and 88B.
pub const DEFAULT_FREQUENCIES: &[u32] = &[161_975_000, 162_025_000];

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub decoder: DecoderConfig,
    pub export: ExportConfig,
}

/// How to start and reach the external sentence decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub command: String,
    pub port: u16,
    /// SDR frequency correction in ppm, passed through untouched
    pub ppm_error: i32,
    pub frequencies: Vec<u32>,
    pub startup_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            decoder: DecoderConfig {
                command: "aisdeco".into(),
                port: DEFAULT_PORT,
                ppm_error: 0,
                frequencies: DEFAULT_FREQUENCIES.to_vec(),
                startup_delay_secs: 2,
            },
            export: ExportConfig { dir: ".".into() },
        }
    }
}

/// Get the config directory path (`~/.ais-watch/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".ais-watch")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.ais-watch/config.yaml`.
///
/// Returns default config if the file doesn't exist or can't be read.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.ais-watch/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, AisError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| AisError::Config(e.to_string()))?;

    let path = config_file();
    std::fs::write(&path, serialize_config(config)).map_err(|e| AisError::Config(e.to_string()))?;

    Ok(path)
}

/// Parse simple YAML-like config text. Unknown keys and bad values keep defaults.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        match current_section.as_deref() {
            Some("decoder") => match key {
                "command" => {
                    if let Some(v) = parse_string_value(val) {
                        config.decoder.command = v;
                    }
                }
                "port" => {
                    if let Ok(v) = val.parse::<u16>() {
                        config.decoder.port = v;
                    }
                }
                "ppm_error" => {
                    if let Ok(v) = val.parse::<i32>() {
                        config.decoder.ppm_error = v;
                    }
                }
                "frequencies" => {
                    if let Some(v) = parse_u32_list(val) {
                        config.decoder.frequencies = v;
                    }
                }
                "startup_delay_secs" => {
                    if let Ok(v) = val.parse::<u64>() {
                        config.decoder.startup_delay_secs = v;
                    }
                }
                _ => {}
            },
            Some("export") => {
                if key == "dir" {
                    if let Some(v) = parse_string_value(val) {
                        config.export.dir = v;
                    }
                }
            }
            _ => {}
        }
    }

    config
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

/// Flow-style list: `[161975000, 162025000]`.
fn parse_u32_list(val: &str) -> Option<Vec<u32>> {
    let inner = val.strip_prefix('[')?.strip_suffix(']')?;
    let items: Option<Vec<u32>> = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect();
    items.filter(|v| !v.is_empty())
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# ais-watch configuration".to_string(), String::new()];

    let freqs: Vec<String> = config
        .decoder
        .frequencies
        .iter()
        .map(|f| f.to_string())
        .collect();

    lines.push("decoder:".into());
    lines.push(format!("  command: \"{}\"", config.decoder.command));
    lines.push(format!("  port: {}", config.decoder.port));
    lines.push(format!("  ppm_error: {}", config.decoder.ppm_error));
    lines.push(format!("  frequencies: [{}]", freqs.join(", ")));
    lines.push(format!(
        "  startup_delay_secs: {}",
        config.decoder.startup_delay_secs
    ));
    lines.push(String::new());

    lines.push("export:".into());
    lines.push(format!("  dir: \"{}\"", config.export.dir));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.decoder.command, "aisdeco");
        assert_eq!(config.decoder.port, 1369);
        assert_eq!(config.decoder.frequencies, vec![161_975_000, 162_025_000]);
        assert_eq!(config.export.dir, ".");
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
decoder:
  command: "/opt/aisdeco/aisdeco2"
  port: 30007
  ppm_error: -42
  frequencies: [161975000]
  startup_delay_secs: 5

export:
  dir: "/var/lib/ais-watch"
"#;
        let config = parse_config(text);
        assert_eq!(config.decoder.command, "/opt/aisdeco/aisdeco2");
        assert_eq!(config.decoder.port, 30007);
        assert_eq!(config.decoder.ppm_error, -42);
        assert_eq!(config.decoder.frequencies, vec![161_975_000]);
        assert_eq!(config.decoder.startup_delay_secs, 5);
        assert_eq!(config.export.dir, "/var/lib/ais-watch");
    }

    #[test]
    fn test_parse_config_bad_values_keep_defaults() {
        let text = r#"
decoder:
  port: not-a-port
  frequencies: []
  command: null
"#;
        let config = parse_config(text);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_config_ignores_unknown_sections() {
        let text = "dashboard:\n  port: 9090\nwebhook: \"x\"\n";
        assert_eq!(parse_config(text), Config::default());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.decoder.ppm_error = 57;
        config.decoder.frequencies = vec![162_025_000];
        config.export.dir = "tracks".into();

        let parsed = parse_config(&serialize_config(&config));
        assert_eq!(parsed, config);
    }
}
