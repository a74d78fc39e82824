//! 指标采集与注册
//!
//! - iostat: 磁盘 I/O 与 CPU 占比
//! - meminfo: /proc/meminfo 内存信息

pub mod iostat;
pub mod meminfo;
pub mod registry;
pub mod sampler;

pub use iostat::IostatSampler;
pub use meminfo::MeminfoSampler;
pub use registry::MetricsRegistry;
pub use sampler::Sampler;
