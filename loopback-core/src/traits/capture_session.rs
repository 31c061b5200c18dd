use crate::models::error::CaptureError;
use crate::models::format::MixFormat;

/// One captured packet, borrowed from the OS until it is released.
#[derive(Debug, Clone, Copy)]
pub struct RawPacket<'a> {
    /// Interleaved device-format bytes. May be empty for silent packets.
    pub data: &'a [u8],
    pub frames: u32,
    /// The OS flagged the packet as silence; `data` must be ignored.
    pub silent: bool,
}

/// A live loopback session on one render endpoint.
///
/// Owned exclusively by the capture thread. Dropping the session stops the
/// client and releases every OS handle it holds, on every exit path.
pub trait CaptureSession {
    /// Mix format negotiated when the session was acquired.
    fn format(&self) -> &MixFormat;

    /// Identity token of the endpoint this session captures.
    fn device_id(&self) -> &str;

    /// Identity token of the endpoint that is the default right now.
    fn default_device_id(&self) -> Result<String, CaptureError>;

    /// Frames in the next pending packet, 0 when none is queued.
    fn next_packet_size(&mut self) -> Result<u32, CaptureError>;

    /// Borrow the next packet. Must be followed by `release_packet`.
    fn read_packet(&mut self) -> Result<RawPacket<'_>, CaptureError>;

    /// Hand the packet's buffer back to the OS.
    fn release_packet(&mut self, frames: u32) -> Result<(), CaptureError>;
}
