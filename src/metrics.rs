use prometheus::{Counter, IntCounterVec, Registry};

/// Cache observability counters. The registry is exposed so an embedding
/// application can gather and export it however it serves metrics.
pub struct Metrics {
    pub registry: Registry,
    pub cache_hit_counter: Counter,
    pub cache_miss_counter: Counter,
    pub cache_uncacheable_counter: Counter,
    pub error_counter: Counter,
    pub method_call_counter: IntCounterVec,
}

fn add_prefix(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}

fn register_counter_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
) -> Counter {
    let name = add_prefix(prefix, name);
    let opts = prometheus::Opts::new(name, description);
    let counter = prometheus::Counter::with_opts(opts).unwrap();
    registry.register(Box::new(counter.clone())).unwrap();
    counter
}

fn register_int_counter_vec_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
    labels: &[&str],
) -> IntCounterVec {
    let name = add_prefix(prefix, name);
    let opts = prometheus::Opts::new(name, description);
    let counter_vec = IntCounterVec::new(opts, labels).unwrap();
    registry.register(Box::new(counter_vec.clone())).unwrap();
    counter_vec
}

impl Metrics {
    pub fn new(prefix: &str) -> Self {
        let registry = Registry::new();

        let cache_hit_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_hit_total",
            "Total number of cache hits.",
        );
        let cache_miss_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_miss_total",
            "Total number of cache misses.",
        );
        let cache_uncacheable_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_uncacheable_total",
            "Total number of uncacheable requests.",
        );
        let error_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "error_total",
            "Total number of errors.",
        );
        let method_call_counter = register_int_counter_vec_with_prefix(
            &registry,
            prefix,
            "method_call_total",
            "Total number of method calls",
            &["method", "cache"],
        );

        Self {
            registry,
            cache_hit_counter,
            cache_miss_counter,
            cache_uncacheable_counter,
            error_counter,
            method_call_counter,
        }
    }

    pub fn record_hit(&self, method: &str) {
        self.cache_hit_counter.inc();
        self.method_call_counter
            .with_label_values(&[method, "hit"])
            .inc();
    }

    pub fn record_miss(&self, method: &str) {
        self.cache_miss_counter.inc();
        self.method_call_counter
            .with_label_values(&[method, "miss"])
            .inc();
    }

    pub fn record_uncacheable(&self, method: &str) {
        self.cache_uncacheable_counter.inc();
        self.method_call_counter
            .with_label_values(&[method, "none"])
            .inc();
    }

    pub fn record_error(&self) {
        self.error_counter.inc();
    }
}
