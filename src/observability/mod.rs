pub mod metrics;
pub mod tracing;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

/// Telemetry（メトリクスとトレーシング）を管理する構造体。
#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// トレーシングを初期化し、専用レジストリにメトリクスを登録する。
    ///
    /// # Errors
    /// サブスクライバの初期化またはメトリクス登録に失敗した場合。
    pub fn new() -> Result<Self> {
        tracing::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(registry).context("failed to register metrics")?);
        Ok(Self { metrics })
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Prometheusテキスト形式でレンダリングする。
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        render_prometheus(&self.metrics)
    }

    /// レンダリング結果をファイルに書き出す。バッチジョブなのでスクレイプ先は持たない。
    ///
    /// # Errors
    /// ファイルの書き込みに失敗した場合。
    pub fn write_prometheus(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render_prometheus())
            .with_context(|| format!("failed to write metrics to {}", path.display()))
    }
}

#[must_use]
pub fn render_prometheus(metrics: &Metrics) -> String {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_counters() {
        let metrics = Metrics::standalone().expect("metrics");
        metrics.texts_loaded.inc_by(3);
        metrics.stage_duration.with_label_values(&["loading"]).observe(0.25);

        let rendered = render_prometheus(&metrics);
        assert!(rendered.contains("dream_texts_loaded_total 3"));
        assert!(rendered.contains("dream_stage_duration_seconds_count{stage=\"loading\"} 1"));
    }
}
