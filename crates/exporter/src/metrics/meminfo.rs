//! 内存信息采集
//!
//! 读取 /proc/meminfo，每个键对应一个 `meminfo_<key>_bytes` 指标。
//! 所有数值一律按 KB 换算为字节，包括 HugePages_Total 这类本身不是 KB 的项。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use common::utils::{first_integer, format_bytes};
use common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info};

use super::registry::MetricsRegistry;
use super::sampler::Sampler;

const METRIC_PREFIX: &str = "meminfo_";
const METRIC_SUFFIX: &str = "_bytes";

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid metric name regex"));

/// /proc/meminfo 中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeminfoEntry {
    pub key: String,
    pub value_kb: u64,
}

impl MeminfoEntry {
    /// 字节数，溢出时返回 None
    pub fn value_bytes(&self) -> Option<u64> {
        self.value_kb.checked_mul(1024)
    }

    pub fn metric_name(&self) -> String {
        metric_name(&self.key)
    }

    pub fn help(&self) -> String {
        format!("Memory information: {}", self.key)
    }
}

/// 由键名生成指标名，例如 `MemTotal` -> `meminfo_memtotal_bytes`
pub fn metric_name(key: &str) -> String {
    let lowered = key.to_lowercase();
    let sanitized = INVALID_NAME_CHARS.replace_all(&lowered, "_");
    format!("{}{}{}", METRIC_PREFIX, sanitized, METRIC_SUFFIX)
}

/// 解析 /proc/meminfo 内容，格式不符的行直接跳过
pub fn parse_meminfo(content: &str) -> Vec<MeminfoEntry> {
    content
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value_kb = first_integer(rest)?;
            Some(MeminfoEntry {
                key: key.trim().to_string(),
                value_kb,
            })
        })
        .collect()
}

/// 将解析结果写入注册表，返回实际更新的条目数
pub async fn apply_entries(registry: &MetricsRegistry, entries: &[MeminfoEntry]) -> Result<usize> {
    let mut updated = 0;
    for entry in entries {
        let Some(bytes) = entry.value_bytes() else {
            continue;
        };
        registry
            .set_meminfo(&entry.metric_name(), &entry.help(), bytes as f64)
            .await?;
        updated += 1;
    }
    Ok(updated)
}

/// /proc/meminfo 采集器
pub struct MeminfoSampler {
    path: PathBuf,
    registry: Arc<MetricsRegistry>,
}

impl MeminfoSampler {
    pub fn new(path: impl Into<PathBuf>, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            path: path.into(),
            registry,
        }
    }

    async fn collect(&self) -> Result<()> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("读取 {} 失败: {}", self.path.display(), e),
            ))
        })?;

        let entries = parse_meminfo(&content);
        if let Some(total) = entries
            .iter()
            .find(|entry| entry.key == "MemTotal")
            .and_then(MeminfoEntry::value_bytes)
        {
            debug!("MemTotal: {}", format_bytes(total));
        }

        let updated = apply_entries(&self.registry, &entries).await?;
        info!(entries = updated, "内存指标已更新");
        Ok(())
    }
}

#[async_trait]
impl Sampler for MeminfoSampler {
    fn name(&self) -> &'static str {
        "meminfo"
    }

    async fn sample(&self) -> bool {
        match self.collect().await {
            Ok(()) => true,
            Err(e) => {
                error!("采集内存指标失败: {}", e);
                false
            }
        }
    }
}
