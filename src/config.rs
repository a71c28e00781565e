use std::time::Duration;

// ============================================================================
// Service Configuration
// ============================================================================
//
// Every setting comes from the environment (optionally seeded from a `.env`
// file) and falls back to a documented default:
//
// | Variable                     | Default                | Meaning                          |
// |------------------------------|------------------------|----------------------------------|
// | POSTGRES_HOST                | localhost              | store host                       |
// | POSTGRES_PORT                | 5432                   | store port                       |
// | POSTGRES_USER                | postgres               | store user                       |
// | POSTGRES_PASSWORD            | postgres               | store password                   |
// | POSTGRES_DB                  | orders_data            | database name                    |
// | POSTGRES_MAX_CONNECTIONS     | 10                     | pool size                        |
// | POSTGRES_ACQUIRE_TIMEOUT_MS  | 5000                   | pool acquire timeout             |
// | KAFKA_BROKERS                | localhost:9092         | comma separated broker list      |
// | KAFKA_TOPIC                  | orders                 | order topic                      |
// | KAFKA_GROUP_ID               | order-consumer-group   | consumer group                   |
// | KAFKA_ACKS                   | all                    | `all` or `leader`                |
// | KAFKA_MESSAGE_TIMEOUT_MS     | 5000                   | producer delivery timeout        |
// | KAFKA_POLL_BACKOFF_MS        | 1000                   | backoff after broker read errors |
// | CACHE_POLICY                 | sharded                | `sharded` or `bounded`           |
// | CACHE_SIZE                   | 1000                   | capacity of the bounded cache    |
// | CACHE_SHARDS                 | 2 x parallelism, min 4 | shard count of the sharded cache |
// | CACHE_WARMUP_LIMIT           | 1000                   | rows preloaded at startup        |
// | HTTP_PORT                    | 8081                   | HTTP listen port                 |
// | SHUTDOWN_TIMEOUT_MS          | 5000                   | shutdown grace period            |
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub postgres: PostgresConfig,
    pub kafka: KafkaConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    /// Connection URL. Carries credentials, never log it.
    pub fn dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.user, self.password, self.host, self.port, self.db_name
        )
    }
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    pub acks: AckPolicy,
    pub message_timeout: Duration,
    pub poll_backoff: Duration,
}

/// How many replicas must acknowledge a publish before it counts as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPolicy {
    /// Partition leader only. Lower latency, may lose data on leader failure.
    Leader,
    /// Every in-sync replica.
    All,
}

impl AckPolicy {
    pub fn as_kafka_value(&self) -> &'static str {
        match self {
            AckPolicy::Leader => "1",
            AckPolicy::All => "all",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "leader" | "1" => Some(AckPolicy::Leader),
            "all" | "-1" => Some(AckPolicy::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub policy: CachePolicy,
    /// Capacity of the bounded cache.
    pub size: usize,
    /// Segment count of the sharded cache.
    pub shards: usize,
    /// Rows loaded from the store at startup; 0 disables warm-up.
    pub warmup_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Unbounded map split across independently locked shards.
    Sharded,
    /// Single lock, evicts the oldest inserted key past capacity.
    Bounded,
}

impl CachePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sharded" => Some(CachePolicy::Sharded),
            "bounded" => Some(CachePolicy::Bounded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
}

pub const MIN_CACHE_SHARDS: usize = 4;

/// Default shard count: twice the available parallelism, never below 4.
pub fn default_shard_count() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (parallelism * 2).max(MIN_CACHE_SHARDS)
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is applied first if present.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let postgres = PostgresConfig {
            host: env.string("POSTGRES_HOST", "localhost"),
            port: env.parse_min("POSTGRES_PORT", 5432u16, 1),
            user: env.string("POSTGRES_USER", "postgres"),
            password: env.string("POSTGRES_PASSWORD", "postgres"),
            db_name: env.string("POSTGRES_DB", "orders_data"),
            max_connections: env.parse_min("POSTGRES_MAX_CONNECTIONS", 10u32, 1),
            acquire_timeout: Duration::from_millis(
                env.parse_min("POSTGRES_ACQUIRE_TIMEOUT_MS", 5000u64, 1),
            ),
        };

        let brokers: Vec<String> = env
            .string("KAFKA_BROKERS", "localhost:9092")
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(String::from)
            .collect();

        let kafka = KafkaConfig {
            brokers,
            topic: env.string("KAFKA_TOPIC", "orders"),
            group_id: env.string("KAFKA_GROUP_ID", "order-consumer-group"),
            acks: env
                .raw("KAFKA_ACKS")
                .and_then(|v| AckPolicy::parse(&v))
                .unwrap_or(AckPolicy::All),
            message_timeout: Duration::from_millis(
                env.parse_min("KAFKA_MESSAGE_TIMEOUT_MS", 5000u64, 1),
            ),
            poll_backoff: Duration::from_millis(
                env.parse_min("KAFKA_POLL_BACKOFF_MS", 1000u64, 1),
            ),
        };

        let cache = CacheConfig {
            policy: env
                .raw("CACHE_POLICY")
                .and_then(|v| CachePolicy::parse(&v))
                .unwrap_or(CachePolicy::Sharded),
            size: env.parse_min("CACHE_SIZE", 1000usize, 1),
            shards: env.parse_min("CACHE_SHARDS", default_shard_count(), MIN_CACHE_SHARDS),
            warmup_limit: env.parse_min("CACHE_WARMUP_LIMIT", 1000usize, 0),
        };

        let http = HttpConfig {
            port: env.parse_min("HTTP_PORT", 8081u16, 1),
        };

        let config = Self {
            postgres,
            kafka,
            cache,
            http,
            shutdown_timeout: Duration::from_millis(
                env.parse_min("SHUTDOWN_TIMEOUT_MS", 5000u64, 1),
            ),
        };

        if config.kafka.brokers.is_empty() {
            tracing::warn!("No Kafka brokers configured");
        }

        config
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value for `key`, if any.
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or_else(|| default.to_string())
    }

    /// Parsed value, or `default` when unset, unparsable or below `min`.
    fn parse_min<T>(&self, key: &str, default: T, min: T) -> T
    where
        T: std::str::FromStr + PartialOrd + Copy,
    {
        match self.raw(key).and_then(|v| v.trim().parse::<T>().ok()) {
            Some(value) if value >= min => value,
            _ => default,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
