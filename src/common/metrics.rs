//! Prometheus text metrics shared by the coordinator and storage nodes
//!
//! Per-route request counts and latency, transfer volume, node connection
//! churn keyed by node id, and the outcome mix of reads and uploads.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Upper bounds of the latency buckets, in milliseconds. A final `+Inf`
/// bucket catches the rest.
const LATENCY_BUCKETS_MS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters sharing one metric name, split by a single label value
#[derive(Debug, Default)]
pub struct CounterFamily {
    series: Mutex<BTreeMap<String, u64>>,
}

impl CounterFamily {
    pub fn inc(&self, label: impl Into<String>) {
        *lock(&self.series).entry(label.into()).or_insert(0) += 1;
    }

    pub fn get(&self, label: &str) -> u64 {
        lock(&self.series).get(label).copied().unwrap_or(0)
    }

    fn snapshot(&self) -> Vec<(String, u64)> {
        lock(&self.series)
            .iter()
            .map(|(label, value)| (label.clone(), *value))
            .collect()
    }
}

#[derive(Debug)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; LATENCY_BUCKETS_MS.len() + 1],
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }
}

impl LatencyHistogram {
    pub fn observe(&self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        let slot = LATENCY_BUCKETS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(LATENCY_BUCKETS_MS.len());

        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative `(upper bound, count)` pairs; `None` is `+Inf`
    pub fn cumulative(&self) -> Vec<(Option<f64>, u64)> {
        let bounds = LATENCY_BUCKETS_MS.iter().copied().map(Some).chain([None]);
        let mut running = 0;
        bounds
            .zip(&self.buckets)
            .map(|(bound, bucket)| {
                running += bucket.load(Ordering::Relaxed);
                (bound, running)
            })
            .collect()
    }

    pub fn sum_ms(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct RouteStats {
    pub requests: Counter,
    pub server_errors: Counter,
    pub latency: LatencyHistogram,
}

#[derive(Debug)]
pub struct MetricsRegistry {
    routes: Mutex<BTreeMap<String, Arc<RouteStats>>>,

    pub bytes_read: Counter,
    pub bytes_written: Counter,

    /// Handles dropped to disconnected after a failed call, by node id
    pub node_disconnects: CounterFamily,
    /// Successful name lookups, by node id
    pub node_reconnects: CounterFamily,
    /// Lookups that left the handle disconnected, by node id
    pub node_lookup_failures: CounterFamily,

    /// Coordinator downloads by outcome
    pub reads: CounterFamily,
    /// Coordinator uploads by outcome
    pub uploads: CounterFamily,

    started: Instant,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self {
            routes: Mutex::default(),
            bytes_read: Counter::default(),
            bytes_written: Counter::default(),
            node_disconnects: CounterFamily::default(),
            node_reconnects: CounterFamily::default(),
            node_lookup_failures: CounterFamily::default(),
            reads: CounterFamily::default(),
            uploads: CounterFamily::default(),
            started: Instant::now(),
        }
    }
}

impl MetricsRegistry {
    pub fn route(&self, route: &str) -> Arc<RouteStats> {
        lock(&self.routes).entry(route.to_string()).or_default().clone()
    }

    pub fn record_request(&self, route: &str, elapsed: Duration, server_error: bool) {
        let stats = self.route(route);
        stats.requests.inc();
        stats.latency.observe(elapsed);
        if server_error {
            stats.server_errors.inc();
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Render in the Prometheus text exposition format
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();

        let scalars = [
            (
                "minifs_uptime_seconds",
                "gauge",
                "Seconds since process start",
                self.uptime().as_secs(),
            ),
            (
                "minifs_bytes_read_total",
                "counter",
                "File bytes served",
                self.bytes_read.get(),
            ),
            (
                "minifs_bytes_written_total",
                "counter",
                "File bytes accepted",
                self.bytes_written.get(),
            ),
        ];
        for (name, kind, help, value) in scalars {
            write_header(&mut out, name, kind, help);
            let _ = writeln!(out, "{} {}", name, value);
        }

        let families = [
            (
                "minifs_node_disconnects_total",
                "node",
                "Node handles dropped after a failed call",
                &self.node_disconnects,
            ),
            (
                "minifs_node_reconnects_total",
                "node",
                "Successful node name lookups",
                &self.node_reconnects,
            ),
            (
                "minifs_node_lookup_failures_total",
                "node",
                "Failed node name lookups",
                &self.node_lookup_failures,
            ),
            ("minifs_reads_total", "outcome", "Downloads by outcome", &self.reads),
            ("minifs_uploads_total", "outcome", "Uploads by outcome", &self.uploads),
        ];
        for (name, label, help, family) in families {
            write_header(&mut out, name, "counter", help);
            for (value, count) in family.snapshot() {
                let _ = writeln!(out, "{}{{{}=\"{}\"}} {}", name, label, value, count);
            }
        }

        let routes: Vec<(String, Arc<RouteStats>)> = lock(&self.routes)
            .iter()
            .map(|(route, stats)| (route.clone(), stats.clone()))
            .collect();

        write_header(&mut out, "minifs_requests_total", "counter", "Requests per route");
        for (route, stats) in &routes {
            let _ = writeln!(
                out,
                "minifs_requests_total{{route=\"{}\"}} {}",
                route,
                stats.requests.get()
            );
        }

        write_header(
            &mut out,
            "minifs_request_errors_total",
            "counter",
            "5xx responses per route",
        );
        for (route, stats) in &routes {
            let _ = writeln!(
                out,
                "minifs_request_errors_total{{route=\"{}\"}} {}",
                route,
                stats.server_errors.get()
            );
        }

        write_header(
            &mut out,
            "minifs_request_duration_ms",
            "histogram",
            "Request latency in milliseconds",
        );
        for (route, stats) in &routes {
            for (bound, count) in stats.latency.cumulative() {
                let le = bound.map_or_else(|| "+Inf".to_string(), |b| b.to_string());
                let _ = writeln!(
                    out,
                    "minifs_request_duration_ms_bucket{{route=\"{}\",le=\"{}\"}} {}",
                    route, le, count
                );
            }
            let _ = writeln!(
                out,
                "minifs_request_duration_ms_sum{{route=\"{}\"}} {}",
                route,
                stats.latency.sum_ms()
            );
            let _ = writeln!(
                out,
                "minifs_request_duration_ms_count{{route=\"{}\"}} {}",
                route,
                stats.latency.count()
            );
        }

        out
    }
}

fn write_header(out: &mut String, name: &str, kind: &str, help: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

pub static METRICS: once_cell::sync::Lazy<MetricsRegistry> =
    once_cell::sync::Lazy::new(MetricsRegistry::default);
