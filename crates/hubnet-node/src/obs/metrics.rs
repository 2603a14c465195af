//! Minimal metrics registry for a node.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Label sets are sorted into a key vector so rendering is deterministic.
//! Histogram buckets are fixed in microseconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn render_labels(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across every label set.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, render_labels(r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }
    pub fn dec(&self, labels: &[(&str, &str)]) {
        self.add(labels, -1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} gauge");
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, render_labels(r.key()), val);
        }
    }
}

// 50us, 100us, 500us, 1ms, 5ms, 10ms, 50ms
const BUCKETS_MICROS: [u64; 7] = [50, 100, 500, 1_000, 5_000, 10_000, 50_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration into cumulative buckets (microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self.map.entry(label_key(labels)).or_default();
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= le {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let hist = r.value();
            let labels = render_labels(r.key());
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{labels},")
            };

            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let n = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {n}");
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{name}_sum{{{labels}}} {}", hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
        }
    }
}

/// Per-node metrics. One instance lives in the node context.
#[derive(Default)]
pub struct NodeMetrics {
    pub published: CounterVec,
    pub publish_failures: CounterVec,
    pub inbound: CounterVec,
    pub unknown_types: CounterVec,
    pub decode_errors: CounterVec,
    pub listener_panics: CounterVec,
    pub module_failures: CounterVec,
    pub chat_delivered: CounterVec,
    pub subscriptions: GaugeVec,
    pub post_chain_duration: HistogramVec, // In Microseconds
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render every metric in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.published.render("hubnet_bus_published_total", &mut out);
        self.publish_failures.render("hubnet_bus_publish_failures_total", &mut out);
        self.inbound.render("hubnet_bus_inbound_total", &mut out);
        self.unknown_types.render("hubnet_bus_unknown_type_total", &mut out);
        self.decode_errors.render("hubnet_bus_decode_errors_total", &mut out);
        self.listener_panics.render("hubnet_bus_listener_panics_total", &mut out);
        self.module_failures.render("hubnet_chat_module_failures_total", &mut out);
        self.chat_delivered.render("hubnet_chat_delivered_total", &mut out);
        self.subscriptions.render("hubnet_bus_subscriptions", &mut out);
        self.post_chain_duration.render("hubnet_chat_post_chain_micros", &mut out);
        out
    }
}
