use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::StatusCode;

use crate::decision::RestartReason;
use crate::error::Error;
use crate::util::lock_unpoisoned;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientMetricsSnapshot {
    pub sends_started: u64,
    pub sends_succeeded: u64,
    pub sends_failed: u64,
    pub dispatches: u64,
    pub restarts: u64,
    pub retries: u64,
    pub transport_retries: u64,
    pub auth_refreshes: u64,
    pub in_flight: u64,
    pub latency_samples: u64,
    pub latency_total_ms: u64,
    pub latency_avg_ms: f64,
    pub status_counts: BTreeMap<u16, u64>,
    pub error_counts: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ClientMetrics {
    inner: Option<Arc<ClientMetricsInner>>,
}

#[derive(Debug, Default)]
struct ClientMetricsInner {
    sends_started: AtomicU64,
    sends_succeeded: AtomicU64,
    sends_failed: AtomicU64,
    dispatches: AtomicU64,
    restarts: AtomicU64,
    retries: AtomicU64,
    transport_retries: AtomicU64,
    auth_refreshes: AtomicU64,
    in_flight: AtomicU64,
    latency_total_ms: AtomicU64,
    latency_samples: AtomicU64,
    status_counts: Mutex<BTreeMap<u16, u64>>,
    error_counts: Mutex<BTreeMap<String, u64>>,
}

pub(crate) struct InFlightGuard {
    inner: Option<Arc<ClientMetricsInner>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(inner) = &self.inner {
            inner.in_flight.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl ClientMetrics {
    pub(crate) fn enabled() -> Self {
        Self {
            inner: Some(Arc::new(ClientMetricsInner::default())),
        }
    }

    pub(crate) fn disabled() -> Self {
        Self::default()
    }

    pub(crate) fn record_send_started(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.sends_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn enter_in_flight(&self) -> InFlightGuard {
        match &self.inner {
            Some(inner) => {
                inner.in_flight.fetch_add(1, Ordering::Relaxed);
                InFlightGuard {
                    inner: Some(Arc::clone(inner)),
                }
            }
            None => InFlightGuard { inner: None },
        }
    }

    pub(crate) fn record_dispatch(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_status(&self, status: StatusCode) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut status_counts = lock_unpoisoned(&inner.status_counts);
        *status_counts.entry(status.as_u16()).or_insert(0) += 1;
    }

    pub(crate) fn record_restart(&self, reason: RestartReason) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.restarts.fetch_add(1, Ordering::Relaxed);
        match reason {
            RestartReason::AuthRefreshed => {}
            RestartReason::Retry { .. } => {
                inner.retries.fetch_add(1, Ordering::Relaxed);
            }
            RestartReason::TransportRetry { .. } => {
                inner.transport_retries.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_auth_refresh(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.auth_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_completed<T>(&self, result: &Result<T, Error>, latency: Duration) {
        let Some(inner) = &self.inner else {
            return;
        };
        match result {
            Ok(_) => {
                inner.sends_succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                inner.sends_failed.fetch_add(1, Ordering::Relaxed);
                let key = match error {
                    Error::Transport { kind, .. } => format!("transport:{kind}"),
                    Error::Api { status, .. } => format!("api:{status}"),
                    other => other.code().as_str().to_owned(),
                };
                let mut error_counts = lock_unpoisoned(&inner.error_counts);
                *error_counts.entry(key).or_insert(0) += 1;
            }
        }
        let latency_ms = latency.as_millis().min(u64::MAX as u128) as u64;
        inner
            .latency_total_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        inner.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ClientMetricsSnapshot {
        let Some(inner) = &self.inner else {
            return ClientMetricsSnapshot::default();
        };
        let latency_samples = inner.latency_samples.load(Ordering::Relaxed);
        let latency_total_ms = inner.latency_total_ms.load(Ordering::Relaxed);
        let latency_avg_ms = if latency_samples == 0 {
            0.0
        } else {
            latency_total_ms as f64 / latency_samples as f64
        };
        ClientMetricsSnapshot {
            sends_started: inner.sends_started.load(Ordering::Relaxed),
            sends_succeeded: inner.sends_succeeded.load(Ordering::Relaxed),
            sends_failed: inner.sends_failed.load(Ordering::Relaxed),
            dispatches: inner.dispatches.load(Ordering::Relaxed),
            restarts: inner.restarts.load(Ordering::Relaxed),
            retries: inner.retries.load(Ordering::Relaxed),
            transport_retries: inner.transport_retries.load(Ordering::Relaxed),
            auth_refreshes: inner.auth_refreshes.load(Ordering::Relaxed),
            in_flight: inner.in_flight.load(Ordering::Relaxed),
            latency_samples,
            latency_total_ms,
            latency_avg_ms,
            status_counts: lock_unpoisoned(&inner.status_counts).clone(),
            error_counts: lock_unpoisoned(&inner.error_counts).clone(),
        }
    }
}
