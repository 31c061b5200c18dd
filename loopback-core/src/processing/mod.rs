pub mod accumulation_buffer;
pub mod deinterleave;
pub mod meter;
pub mod sample_format;
