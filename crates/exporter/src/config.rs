//! 配置管理

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use common::{Error, Result};

/// 默认导出端口
pub const DEFAULT_PORT: u16 = 18000;
/// 默认采集间隔（秒）
pub const DEFAULT_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_IOSTAT_COMMAND: &str = "iostat";
pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub sample_interval: Duration,
    pub iostat_command: String,
    pub meminfo_path: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_PORT,
            sample_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            iostat_command: DEFAULT_IOSTAT_COMMAND.to_string(),
            meminfo_path: PathBuf::from(DEFAULT_MEMINFO_PATH),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置，未设置的项使用默认值
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_port = parse_or(&lookup, "EXPORTER_PORT", defaults.listen_port)?;

        let interval_secs: u64 =
            parse_or(&lookup, "SAMPLE_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;

        let iostat_command = lookup("IOSTAT_COMMAND").unwrap_or(defaults.iostat_command);

        let meminfo_path = lookup("MEMINFO_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.meminfo_path);

        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            listen_port,
            sample_interval: Duration::from_secs(interval_secs),
            iostat_command,
            meminfo_path,
            log_level,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} 取值无效 ({}): {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.listen_port, 18000);
        assert_eq!(cfg.sample_interval, Duration::from_secs(1));
        assert_eq!(cfg.iostat_command, "iostat");
        assert_eq!(cfg.meminfo_path, PathBuf::from("/proc/meminfo"));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("EXPORTER_PORT", "9100"),
            ("SAMPLE_INTERVAL_SECS", "5"),
            ("IOSTAT_COMMAND", "/usr/local/bin/iostat"),
            ("MEMINFO_PATH", "/tmp/meminfo"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.listen_port, 9100);
        assert_eq!(cfg.sample_interval, Duration::from_secs(5));
        assert_eq!(cfg.iostat_command, "/usr/local/bin/iostat");
        assert_eq!(cfg.meminfo_path, PathBuf::from("/tmp/meminfo"));
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup_from(&[("EXPORTER_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("EXPORTER_PORT"));
    }
}
