//! 磁盘 I/O 与 CPU 采集
//!
//! 执行 iostat 命令，解析其文本输出：
//! - `%user` 表头的下一行为 CPU 各模式占比
//! - `Device` 表头之后的每一非空行为一个设备的统计

use std::sync::Arc;

use async_trait::async_trait;
use common::{Error, Result};
use tokio::process::Command;
use tracing::{debug, error, info};

use super::registry::MetricsRegistry;
use super::sampler::Sampler;

const CPU_HEADER_MARKER: &str = "%user";
const DEVICE_HEADER_MARKER: &str = "Device";
const CPU_FIELD_COUNT: usize = 6;
const DEVICE_FIELD_COUNT: usize = 4;

/// CPU 各模式占比（%）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuStats {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub iowait: f64,
    pub steal: f64,
    pub idle: f64,
}

impl CpuStats {
    /// 模式名与取值，顺序即 iostat 输出的列顺序
    pub fn modes(&self) -> [(&'static str, f64); CPU_FIELD_COUNT] {
        [
            ("user", self.user),
            ("nice", self.nice),
            ("system", self.system),
            ("iowait", self.iowait),
            ("steal", self.steal),
            ("idle", self.idle),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            user: parse_field(fields[0])?,
            nice: parse_field(fields[1])?,
            system: parse_field(fields[2])?,
            iowait: parse_field(fields[3])?,
            steal: parse_field(fields[4])?,
            idle: parse_field(fields[5])?,
        })
    }
}

/// 单个设备的统计
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStats {
    pub device: String,
    pub tps: f64,
    pub kb_read_per_sec: f64,
    pub kb_write_per_sec: f64,
}

impl DeviceStats {
    pub fn read_bytes_per_sec(&self) -> f64 {
        self.kb_read_per_sec * 1024.0
    }

    pub fn write_bytes_per_sec(&self) -> f64 {
        self.kb_write_per_sec * 1024.0
    }
}

/// 一次 iostat 输出的解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IostatReport {
    /// 未找到 CPU 表头或数据行字段不足时为 None
    pub cpu: Option<CpuStats>,
    pub devices: Vec<DeviceStats>,
}

/// 解析 iostat 文本输出
///
/// 字段不足的行直接跳过；字段数足够但数值无法解析时返回错误
pub fn parse_iostat(output: &str) -> Result<IostatReport> {
    let lines: Vec<&str> = output.lines().collect();
    let mut report = IostatReport::default();

    // 只看第一个后面还有数据行的 CPU 表头
    if let Some(header) = lines
        .iter()
        .enumerate()
        .position(|(i, line)| line.contains(CPU_HEADER_MARKER) && i + 1 < lines.len())
    {
        let fields: Vec<&str> = lines[header + 1].split_whitespace().collect();
        if fields.len() >= CPU_FIELD_COUNT {
            report.cpu = Some(CpuStats::from_fields(&fields)?);
        }
    }

    let mut in_device_section = false;
    for line in &lines {
        if line.contains(DEVICE_HEADER_MARKER) {
            in_device_section = true;
            continue;
        }
        if !in_device_section || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < DEVICE_FIELD_COUNT {
            continue;
        }

        report.devices.push(DeviceStats {
            device: fields[0].to_string(),
            tps: parse_field(fields[1])?,
            kb_read_per_sec: parse_field(fields[2])?,
            kb_write_per_sec: parse_field(fields[3])?,
        });
    }

    Ok(report)
}

fn parse_field(raw: &str) -> Result<f64> {
    raw.parse()
        .map_err(|e| Error::Parse(format!("无效数值 {:?}: {}", raw, e)))
}

/// 将解析结果写入注册表
pub fn apply_report(registry: &MetricsRegistry, report: &IostatReport) {
    if let Some(cpu) = &report.cpu {
        registry.set_cpu(cpu);
        info!("CPU 指标已更新");
    }

    for stats in &report.devices {
        registry.set_device(stats);
        info!(device = %stats.device, "I/O 指标已更新");
    }
}

/// iostat 采集器
pub struct IostatSampler {
    command: String,
    registry: Arc<MetricsRegistry>,
}

impl IostatSampler {
    pub fn new(command: impl Into<String>, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            command: command.into(),
            registry,
        }
    }

    /// 执行命令并返回标准输出
    async fn run_command(&self) -> Result<String> {
        let output = Command::new(&self.command)
            .output()
            .await
            .map_err(|e| Error::Command(format!("无法执行 {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Command(format!(
                "{} 退出状态 {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::Command(format!("{} 输出不是有效的 UTF-8: {}", self.command, e)))
    }

    async fn collect(&self) -> Result<()> {
        let output = self.run_command().await?;
        debug!("iostat 输出: {}", output);

        let report = parse_iostat(&output)?;
        apply_report(&self.registry, &report);
        Ok(())
    }
}

#[async_trait]
impl Sampler for IostatSampler {
    fn name(&self) -> &'static str {
        "iostat"
    }

    async fn sample(&self) -> bool {
        match self.collect().await {
            Ok(()) => true,
            Err(e) => {
                error!("采集 iostat 指标失败: {}", e);
                false
            }
        }
    }
}
