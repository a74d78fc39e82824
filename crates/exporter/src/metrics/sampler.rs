use async_trait::async_trait;

/// 采集器
///
/// 每次调用完成一轮采集并更新注册表。错误在内部记录日志，
/// 只以返回值告知调用方是否成功
#[async_trait]
pub trait Sampler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn sample(&self) -> bool;
}
