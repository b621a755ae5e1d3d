use broccoli_queue::queue::BroccoliQueueBuilder;
pub use broccoli_queue::{
    brokers::broker::BrokerMessage,
    error::BroccoliError,
    queue::{BroccoliQueue, ConsumeOptions},
};

use crate::error::MqError;

/// Connected queue handle shared by publishers and consumers.
pub type MqQueue = BroccoliQueue;
pub type MqBuilder = BroccoliQueueBuilder;

/// Broker connection settings. Queue names live in `common::config`.
pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

/// Connect to the Redis broker and build the shared queue handle.
pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}
