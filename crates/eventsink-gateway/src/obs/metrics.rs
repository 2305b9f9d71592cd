//! Label-indexed counter and histogram aggregates.
//!
//! Labels are flattened into sorted key vectors to keep deterministic
//! identity. Histogram observations are accumulated as integer nanoseconds
//! to avoid floating point atomics, and rendered in seconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let key = label_key(labels);
        // Fast path: existing series only needs a shared lock.
        if let Some(counter) = self.map.get(&key) {
            counter.fetch_add(v, Ordering::Relaxed);
            return;
        }
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set.
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over every series whose labels include all of `labels`.
    pub fn sum_where(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .iter()
            .filter(|r| {
                labels
                    .iter()
                    .all(|(k, v)| r.key().iter().any(|(rk, rv)| rk == k && rv == v))
            })
            .map(|r| r.value().load(Ordering::Relaxed))
            .sum()
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "counter");
        let mut rows: Vec<(LabelKey, u64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (key, val) in rows {
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(&key), val);
        }
    }
}

/// Prometheus default buckets, in seconds.
const BUCKETS_SECONDS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Same bounds in nanoseconds, used on the hot path.
const BUCKETS_NANOS: [u64; 11] = [
    5_000_000,
    10_000_000,
    25_000_000,
    50_000_000,
    100_000_000,
    250_000_000,
    500_000_000,
    1_000_000_000,
    2_500_000_000,
    5_000_000_000,
    10_000_000_000,
];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum_nanos: AtomicU64,
    buckets: [AtomicU64; 11],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let key = label_key(labels);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        let record = |hist: &AtomicHistogram| {
            hist.count.fetch_add(1, Ordering::Relaxed);
            hist.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
            for (i, &b) in BUCKETS_NANOS.iter().enumerate() {
                if nanos <= b {
                    hist.buckets[i].fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        if let Some(hist) = self.map.get(&key) {
            record(hist.value());
            return;
        }
        let hist = self.map.entry(key).or_insert_with(AtomicHistogram::default);
        record(hist.value());
    }

    /// Number of observations for an exact label set.
    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "histogram");
        let mut keys: Vec<LabelKey> = self.map.iter().map(|r| r.key().clone()).collect();
        keys.sort();

        for key in keys {
            let Some(hist) = self.map.get(&key) else { continue };
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, le) in BUCKETS_SECONDS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = hist.sum_nanos.load(Ordering::Relaxed) as f64 / 1e9;
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, count);
        }
    }
}

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

/// Process-wide request instrumentation context.
///
/// Built once at startup and shared by reference; tests build their own.
#[derive(Default)]
pub struct HttpMetrics {
    /// Labels: route, method, code (status text).
    pub requests: CounterVec,
    /// Labels: route, method.
    pub duration: HistogramVec,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished request.
    pub fn record(&self, route: &str, method: &str, code: &str, elapsed: Duration) {
        self.requests
            .inc(&[("route", route), ("method", method), ("code", code)]);
        self.duration
            .observe(&[("route", route), ("method", method)], elapsed);
    }

    /// Total requests seen for a route/method across all status labels.
    pub fn requests_for(&self, route: &str, method: &str) -> u64 {
        self.requests.sum_where(&[("route", route), ("method", method)])
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests.render(REQUESTS_TOTAL, "Total HTTP requests", &mut out);
        self.duration.render(REQUEST_DURATION, "HTTP request latency", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_label_order_does_not_matter() {
        let c = CounterVec::default();
        c.inc(&[("route", "/events"), ("method", "GET")]);
        c.inc(&[("method", "GET"), ("route", "/events")]);
        assert_eq!(c.get(&[("route", "/events"), ("method", "GET")]), 2);
    }

    #[test]
    fn sum_where_spans_status_labels() {
        let m = HttpMetrics::new();
        m.record("/events", "POST", "Created", Duration::from_millis(1));
        m.record("/events", "POST", "Bad Request", Duration::from_millis(1));
        m.record("/events", "GET", "OK", Duration::from_millis(1));
        assert_eq!(m.requests_for("/events", "POST"), 2);
        assert_eq!(m.requests_for("/events", "GET"), 1);
        assert_eq!(m.duration.count(&[("route", "/events"), ("method", "POST")]), 2);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = HistogramVec::default();
        let labels = [("route", "/healthz"), ("method", "GET")];
        h.observe(&labels, Duration::from_micros(300));
        h.observe(&labels, Duration::from_millis(30));
        h.observe(&labels, Duration::from_secs(20));

        let mut out = String::new();
        h.render("lat", "latency", &mut out);
        assert!(out.contains("lat_bucket{method=\"GET\",route=\"/healthz\",le=\"0.005\"} 1\n"));
        assert!(out.contains("lat_bucket{method=\"GET\",route=\"/healthz\",le=\"0.05\"} 2\n"));
        assert!(out.contains("lat_bucket{method=\"GET\",route=\"/healthz\",le=\"10\"} 2\n"));
        assert!(out.contains("lat_bucket{method=\"GET\",route=\"/healthz\",le=\"+Inf\"} 3\n"));
        assert!(out.contains("lat_count{method=\"GET\",route=\"/healthz\"} 3\n"));
    }

    #[test]
    fn sub_millisecond_observations_keep_resolution() {
        let h = HistogramVec::default();
        h.observe(&[], Duration::from_micros(250));
        let mut out = String::new();
        h.render("lat", "latency", &mut out);
        assert!(out.contains("lat_sum{} 0.00025\n"), "{out}");
    }

    #[test]
    fn render_has_help_and_type_lines() {
        let m = HttpMetrics::new();
        m.record("/healthz", "GET", "OK", Duration::from_millis(2));
        let out = m.render();
        assert!(out.contains("# HELP http_requests_total Total HTTP requests\n"));
        assert!(out.contains("# TYPE http_requests_total counter\n"));
        assert!(out.contains("# TYPE http_request_duration_seconds histogram\n"));
        assert!(out.contains("http_requests_total{code=\"OK\",method=\"GET\",route=\"/healthz\"} 1\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        let c = CounterVec::default();
        c.inc(&[("route", "a\"b")]);
        let mut out = String::new();
        c.render("x", "x", &mut out);
        assert!(out.contains("x{route=\"a\\\"b\"} 1"));
    }
}
