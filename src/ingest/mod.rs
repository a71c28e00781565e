mod consumer;

pub use consumer::OrderConsumer;
