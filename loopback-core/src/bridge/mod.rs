pub mod processing_bridge;
