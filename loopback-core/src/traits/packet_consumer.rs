use std::sync::Arc;

use parking_lot::Mutex;

/// Converted samples handed to a consumer for the duration of one call.
#[derive(Debug, Clone, Copy)]
pub struct AudioPacket<'a> {
    /// Interleaved normalized samples, `frames * channels` long.
    pub samples: &'a [f32],
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioPacket<'_> {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Receiver of captured packets.
///
/// Called on the capture thread while it holds the consumer's mutex. Keep
/// work bounded: packets arriving while the mutex is held elsewhere are
/// dropped.
pub trait PacketConsumer: Send {
    fn on_packet(&mut self, packet: &AudioPacket<'_>);
}

/// The consumer's mutex doubles as the delivery lock.
pub type SharedConsumer = Arc<Mutex<dyn PacketConsumer>>;
