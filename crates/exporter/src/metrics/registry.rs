//! 指标注册表
//!
//! 封装 prometheus::Registry，持有磁盘 / CPU 的固定指标，
//! 以及按 /proc/meminfo 键名动态创建的内存指标

use std::collections::HashMap;

use common::{Error, Result};
use prometheus::{proto::MetricFamily, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use tokio::sync::RwLock;
use tracing::debug;

use super::iostat::{CpuStats, DeviceStats};

pub const DEVICE_LABEL: &str = "device";
pub const MODE_LABEL: &str = "mode";

/// 进程级指标注册表
pub struct MetricsRegistry {
    registry: Registry,
    /// 读速率 (KB/s)
    io_read_rate: GaugeVec,
    /// 写速率 (KB/s)
    io_write_rate: GaugeVec,
    io_tps: GaugeVec,
    io_read_bytes: GaugeVec,
    io_write_bytes: GaugeVec,
    cpu_avg_percent: GaugeVec,
    /// 动态内存指标：指标名 -> Gauge
    meminfo: RwLock<HashMap<String, Gauge>>,
}

impl MetricsRegistry {
    /// 创建注册表并注册全部固定指标
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let io_read_rate = register_vec(
            &registry,
            "io_read_rate",
            "I/O read rate in KB/s",
            DEVICE_LABEL,
        )?;
        let io_write_rate = register_vec(
            &registry,
            "io_write_rate",
            "I/O write rate in KB/s",
            DEVICE_LABEL,
        )?;
        let io_tps = register_vec(
            &registry,
            "io_tps",
            "I/O transactions per second",
            DEVICE_LABEL,
        )?;
        let io_read_bytes = register_vec(&registry, "io_read_bytes", "I/O read bytes", DEVICE_LABEL)?;
        let io_write_bytes =
            register_vec(&registry, "io_write_bytes", "I/O write bytes", DEVICE_LABEL)?;
        let cpu_avg_percent = register_vec(
            &registry,
            "cpu_avg_percent",
            "CPU average percentage",
            MODE_LABEL,
        )?;

        Ok(Self {
            registry,
            io_read_rate,
            io_write_rate,
            io_tps,
            io_read_bytes,
            io_write_bytes,
            cpu_avg_percent,
            meminfo: RwLock::new(HashMap::new()),
        })
    }

    /// 覆盖写入全部 CPU 模式
    pub fn set_cpu(&self, cpu: &CpuStats) {
        for (mode, value) in cpu.modes() {
            self.cpu_avg_percent.with_label_values(&[mode]).set(value);
        }
    }

    /// 写入单个设备的五项指标，设备首次出现时自动创建
    pub fn set_device(&self, stats: &DeviceStats) {
        let labels = [stats.device.as_str()];
        self.io_tps.with_label_values(&labels).set(stats.tps);
        self.io_read_rate
            .with_label_values(&labels)
            .set(stats.kb_read_per_sec);
        self.io_write_rate
            .with_label_values(&labels)
            .set(stats.kb_write_per_sec);
        self.io_read_bytes
            .with_label_values(&labels)
            .set(stats.read_bytes_per_sec());
        self.io_write_bytes
            .with_label_values(&labels)
            .set(stats.write_bytes_per_sec());
    }

    /// 设置内存指标，不存在则先创建并注册
    pub async fn set_meminfo(&self, name: &str, help: &str, value: f64) -> Result<()> {
        {
            let gauges = self.meminfo.read().await;
            if let Some(gauge) = gauges.get(name) {
                gauge.set(value);
                return Ok(());
            }
        }

        let mut gauges = self.meminfo.write().await;
        // 获取写锁期间可能已被创建
        if let Some(gauge) = gauges.get(name) {
            gauge.set(value);
            return Ok(());
        }

        let gauge = Gauge::new(name, help)?;
        self.registry.register(Box::new(gauge.clone()))?;
        gauge.set(value);
        gauges.insert(name.to_string(), gauge);
        debug!(metric = name, "注册内存指标");

        Ok(())
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// 按 Prometheus 文本格式输出全部指标
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("指标文本编码失败: {}", e)))
    }
}

// 只读查询，供测试校验当前值
#[cfg(test)]
impl MetricsRegistry {
    /// 已创建的内存指标名（排序后）
    pub async fn meminfo_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meminfo.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// 读取内存指标当前值
    pub async fn meminfo_value(&self, name: &str) -> Option<f64> {
        self.meminfo.read().await.get(name).map(|g| g.get())
    }

    /// 读取 CPU 模式当前值，尚未采集时返回 None
    pub fn cpu_value(&self, mode: &str) -> Option<f64> {
        self.labelled_value("cpu_avg_percent", MODE_LABEL, mode)
    }

    /// 读取设备指标当前值
    pub fn device_value(&self, metric: &str, device: &str) -> Option<f64> {
        self.labelled_value(metric, DEVICE_LABEL, device)
    }

    // 通过 gather 读取，避免 with_label_values 顺带创建子指标
    fn labelled_value(&self, name: &str, label: &str, label_value: &str) -> Option<f64> {
        self.gather()
            .into_iter()
            .find(|family| family.get_name() == name)?
            .get_metric()
            .iter()
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == label && pair.get_value() == label_value)
            })
            .map(|metric| metric.get_gauge().get_value())
    }
}

fn register_vec(registry: &Registry, name: &str, help: &str, label: &str) -> Result<GaugeVec> {
    let vec = GaugeVec::new(Opts::new(name, help), &[label])?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}
