use common_kafka::config::{ConsumerConfig, KafkaConfig};
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3301")]
    pub port: u16,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(nested = true)]
    pub consumer: ConsumerConfig,

    // One group-member consumer per worker, so the broker hands each worker
    // a disjoint subset of partitions.
    #[envconfig(default = "4")]
    pub worker_count: usize,

    // Comments longer than this (in characters) get a warning record
    #[envconfig(default = "200")]
    pub comment_length_limit: usize,

    // Workers report liveness once per message cycle; a worker silent for
    // this long is considered stalled and fails the liveness probe.
    #[envconfig(default = "300")]
    pub worker_liveness_deadline_seconds: u64,
}

impl Config {
    pub fn init_with_defaults() -> Result<Self, envconfig::Error> {
        ConsumerConfig::set_defaults("feedback-consumer", "feedback-submitted");
        Self::init_from_env()
    }
}
