//! 采集循环
//!
//! 依次执行全部采集器，然后休眠固定间隔，永不退出。
//! 采集失败只记录日志，不影响下一轮

use std::time::Duration;

use tracing::{debug, warn};

use crate::metrics::Sampler;

pub struct Scheduler {
    samplers: Vec<Box<dyn Sampler>>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(samplers: Vec<Box<dyn Sampler>>, interval: Duration) -> Self {
        Self { samplers, interval }
    }

    /// 执行一轮采集，返回每个采集器的结果
    pub async fn run_once(&self) -> Vec<(&'static str, bool)> {
        let mut results = Vec::with_capacity(self.samplers.len());
        for sampler in &self.samplers {
            let ok = sampler.sample().await;
            if ok {
                debug!(sampler = sampler.name(), "采集完成");
            } else {
                warn!(sampler = sampler.name(), "本轮采集失败");
            }
            results.push((sampler.name(), ok));
        }
        results
    }

    pub async fn run(&self) {
        loop {
            self.run_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSampler {
        name: &'static str,
        ok: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Sampler for CountingSampler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn sample(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.ok
        }
    }

    #[tokio::test]
    async fn test_run_once_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            vec![
                Box::new(CountingSampler { name: "iostat", ok: false, calls: calls.clone() }),
                Box::new(CountingSampler { name: "meminfo", ok: true, calls: calls.clone() }),
            ],
            Duration::from_secs(1),
        );

        let results = scheduler.run_once().await;
        assert_eq!(results, vec![("iostat", false), ("meminfo", true)]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            vec![Box::new(CountingSampler { name: "iostat", ok: false, calls: calls.clone() })],
            Duration::from_secs(1),
        );

        let _ = tokio::time::timeout(Duration::from_millis(3500), scheduler.run()).await;
        // t = 0, 1, 2, 3 秒各执行一次
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
