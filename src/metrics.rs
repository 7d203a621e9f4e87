use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

impl Metrics {
    /// Install the Prometheus recorder once per process and publish the
    /// configured cooldown as a static gauge. Later calls reuse the handle.
    pub fn init(cooldown_secs: i64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe_counter!("submissions_total", "Submissions by outcome.");
                describe_counter!(
                    "credibility_analyses_total",
                    "Credibility analyses by outcome."
                );
                describe_counter!("rewards_xp_awarded_total", "XP points credited.");
                describe_counter!(
                    "fetch_errors_total",
                    "Failed article fetches: refused url, transport error, non-2xx or oversized body."
                );
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        gauge!("rate_limit_cooldown_secs").set(cooldown_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
