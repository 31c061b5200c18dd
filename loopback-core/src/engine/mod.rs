pub mod loopback_engine;
