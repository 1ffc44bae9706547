//! 分发指标收集模块
//!
//! 每个目标的投递结果与整次分发耗时，通过 `metrics` facade 上报。
//! 未安装 recorder 时调用为空操作；`install_recorder` 安装进程内
//! Prometheus recorder，由调用方在结束时 `render()` 输出。

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// 安装全局 Prometheus recorder (无 HTTP listener)
///
/// 每个进程只能成功一次。
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// 记录单个目标的投递结果
pub fn record_delivery(target: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    counter!(
        "broadcast_deliveries_total",
        "target" => target.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录一次分发的总耗时 (毫秒)
pub fn record_dispatch_duration_ms(duration_ms: f64) {
    histogram!("broadcast_dispatch_duration_ms").record(duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_delivery_is_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_delivery("udp", true);
            record_delivery("udp", false);
            record_dispatch_duration_ms(3.0);
        });

        let rendered = handle.render();
        assert!(rendered.contains("broadcast_deliveries_total"));
        assert!(rendered.contains("outcome=\"failed\""));
        assert!(rendered.contains("broadcast_dispatch_duration_ms"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_delivery("null", true);
        record_delivery("log", false);
        record_dispatch_duration_ms(1.5);
    }
}
