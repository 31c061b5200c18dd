pub mod block_processor;
pub mod capture_delegate;
pub mod capture_provider;
pub mod capture_session;
pub mod packet_consumer;
