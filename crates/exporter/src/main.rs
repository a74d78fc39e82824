//! 主机指标导出器
//!
//! 周期性采集 iostat 与 /proc/meminfo，并以 Prometheus 文本格式对外暴露

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};

mod config;
mod http;
mod metrics;
mod scheduler;

use metrics::{IostatSampler, MeminfoSampler, MetricsRegistry, Sampler};
use scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenvy::dotenv().ok();
    let cfg = config::Config::from_env()?;

    // 初始化日志
    // 可以通过环境变量 RUST_LOG 覆盖 LOG_LEVEL，例如：
    // RUST_LOG=hoststat_exporter=debug
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    info!("🚀 启动主机指标导出器 (host: {})...", host);

    let registry = Arc::new(MetricsRegistry::new()?);
    info!("📊 指标注册表已初始化");

    // 先绑定端口，端口被占用时直接退出
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🎯 指标服务监听在 http://{}", addr);

    let state = http::AppState::new(registry.clone());
    tokio::spawn(async move {
        if let Err(e) = http::serve(listener, state).await {
            error!("指标服务异常退出: {}", e);
        }
    });

    let samplers: Vec<Box<dyn Sampler>> = vec![
        Box::new(IostatSampler::new(cfg.iostat_command.clone(), registry.clone())),
        Box::new(MeminfoSampler::new(cfg.meminfo_path.clone(), registry)),
    ];
    let scheduler = Scheduler::new(samplers, cfg.sample_interval);
    info!(
        "⏱️ 采集间隔 {:?}，命令: {}，内存信息: {}",
        cfg.sample_interval,
        cfg.iostat_command,
        cfg.meminfo_path.display()
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("收到退出信号，停止采集");
        }
    }

    Ok(())
}
