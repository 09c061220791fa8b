//! Daemon configuration, loaded once at startup from `visor.toml`.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid transport uri '{0}': expected udp://host[:port]")]
    InvalidTransportUri(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub led_strip: LedStripConfig,
    #[serde(default)]
    pub reactive_face: ReactiveFaceConfig,
    #[serde(default)]
    pub video_player: VideoPlayerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// Primary transport, e.g. `udp://10.0.0.2:5555`. Empty disables
    /// UDP; at least one of UDP and WS must be enabled.
    #[serde(default)]
    pub transport: String,
    #[serde(default)]
    pub ws_enabled: bool,
    pub startup_app: String,
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    #[serde(default = "default_http_listen")]
    pub http_listen: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedStripConfig {
    #[serde(default = "default_led_number")]
    pub led_number: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactiveFaceConfig {
    #[serde(default = "default_preset")]
    pub default_preset: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoPlayerConfig {
    #[serde(default)]
    pub default_video: Option<String>,
    #[serde(default = "default_video_fps")]
    pub max_fps: u32,
}

fn default_target_fps() -> u32 {
    60
}

fn default_http_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_led_number() -> usize {
    30
}

fn default_preset() -> String {
    "default".to_string()
}

fn default_video_fps() -> u32 {
    30
}

impl Default for LedStripConfig {
    fn default() -> Self {
        Self {
            led_number: default_led_number(),
        }
    }
}

impl Default for ReactiveFaceConfig {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
        }
    }
}

impl Default for VideoPlayerConfig {
    fn default() -> Self {
        Self {
            default_video: None,
            max_fps: default_video_fps(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Split a `udp://host[:port]` uri into host and port (default 5555).
pub fn parse_transport_uri(uri: &str) -> Result<(String, u16), ConfigError> {
    let rest = uri
        .strip_prefix("udp://")
        .ok_or_else(|| ConfigError::InvalidTransportUri(uri.to_string()))?;
    if rest.is_empty() {
        return Err(ConfigError::InvalidTransportUri(uri.to_string()));
    }
    match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| ConfigError::InvalidTransportUri(uri.to_string()))?;
            Ok((host.to_string(), port))
        }
        None => Ok((rest.to_string(), 5555)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg: Config = toml::from_str(
            r#"
            [system]
            transport = "udp://10.0.0.2:5555"
            ws_enabled = true
            startup_app = "banner"
            target_fps = 50

            [led_strip]
            led_number = 44
            "#,
        )
        .unwrap();
        assert_eq!(cfg.system.target_fps, 50);
        assert_eq!(cfg.led_strip.led_number, 44);
        assert_eq!(cfg.system.http_listen, "0.0.0.0:8000");
        assert_eq!(cfg.video_player.max_fps, 30);
    }

    #[test]
    fn defaults_apply() {
        let cfg: Config = toml::from_str(
            r#"
            [system]
            startup_app = "glitch"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.system.target_fps, 60);
        assert!(!cfg.system.ws_enabled);
        assert_eq!(cfg.led_strip.led_number, 30);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [system]
            startup_app = "glitch"
            warp_speed = 9
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn transport_uri_forms() {
        assert_eq!(
            parse_transport_uri("udp://10.0.0.2:6000").unwrap(),
            ("10.0.0.2".to_string(), 6000)
        );
        assert_eq!(
            parse_transport_uri("udp://panel.local").unwrap(),
            ("panel.local".to_string(), 5555)
        );
        assert!(parse_transport_uri("tcp://10.0.0.2").is_err());
        assert!(parse_transport_uri("udp://").is_err());
    }
}
