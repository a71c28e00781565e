use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers the three failure domains of the pipeline:
// - Queue publishing (accepted, failed by reason, circuit breaker state)
// - Queue consumption (per-message outcome, latency, broker read errors)
// - Cache (hits and misses on the read path)
//
// The registry is scraped via GET /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Publish Metrics
    pub orders_published: IntCounter,
    pub orders_publish_failed: IntCounterVec,
    pub circuit_breaker_state: IntGauge,

    // Consumer Metrics
    pub consumer_messages: IntCounterVec,
    pub consumer_poll_errors: IntCounter,
    pub consumer_processing_duration: HistogramVec,

    // Cache Metrics
    pub cache_lookups: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_published = IntCounter::new(
            "orders_published_total",
            "Total order payloads accepted by the broker",
        )?;
        registry.register(Box::new(orders_published.clone()))?;

        let orders_publish_failed = IntCounterVec::new(
            Opts::new("orders_publish_failed_total", "Total order payloads rejected before or by the broker"),
            &["reason"],
        )?;
        registry.register(Box::new(orders_publish_failed.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Producer circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let consumer_messages = IntCounterVec::new(
            Opts::new("consumer_messages_total", "Queue messages handled by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(consumer_messages.clone()))?;

        let consumer_poll_errors = IntCounter::new(
            "consumer_poll_errors_total",
            "Broker read errors seen by the consumer loop",
        )?;
        registry.register(Box::new(consumer_poll_errors.clone()))?;

        let consumer_processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "consumer_processing_duration_seconds",
                "Time from message receipt to cache update",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(consumer_processing_duration.clone()))?;

        let cache_lookups = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Order lookups by cache result"),
            &["result"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        Ok(Self {
            registry,
            orders_published,
            orders_publish_failed,
            circuit_breaker_state,
            consumer_messages,
            consumer_poll_errors,
            consumer_processing_duration,
            cache_lookups,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub fn record_publish(&self, success: bool, reason: &str) {
        if success {
            self.orders_published.inc();
        } else {
            self.orders_publish_failed.with_label_values(&[reason]).inc();
        }
    }

    pub fn record_consumed(&self, outcome: &str, duration_secs: f64) {
        self.consumer_messages.with_label_values(&[outcome]).inc();
        self.consumer_processing_duration
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    pub fn update_circuit_breaker_state(&self, state: i64) {
        self.circuit_breaker_state.set(state);
    }
}
