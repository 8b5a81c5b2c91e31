use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct StatusEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> StatusEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// 依序執行 extract -> transform -> load，回傳輸出位置
    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Collecting packaging status...");

        // Extract
        let records = self.pipeline.extract().await?;
        tracing::info!("📥 Collected {} projects", records.len());
        self.monitor.log_stats("Extract");

        // Transform
        let report = self.pipeline.transform(records).await?;
        tracing::info!(
            "🔄 Evaluated {} projects for release {}",
            report.rows.len(),
            report.release
        );
        self.monitor.log_stats("Transform");

        // Load
        let output = self.pipeline.load(report).await?;
        tracing::info!("📁 Report written to: {}", output);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output)
    }
}
