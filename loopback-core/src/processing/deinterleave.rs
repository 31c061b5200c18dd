/// Split one block of interleaved audio into per-channel regions.
///
/// - `interleaved`: `[c0f0, c1f0, ..., c0f1, c1f1, ...]`, at least
///   `block_size * source_channels` samples.
/// - `scratch`: destination, `block_size` samples per destination channel,
///   channel `ch` at `scratch[ch * block_size..(ch + 1) * block_size]`.
///
/// Destination channels with a matching source channel receive that
/// channel's strided samples; the rest are filled with silence. Source
/// channels beyond the destination count are ignored.
pub fn deinterleave_block(interleaved: &[f32], source_channels: usize, block_size: usize, scratch: &mut [f32]) {
    if block_size == 0 {
        return;
    }

    for (ch, region) in scratch.chunks_exact_mut(block_size).enumerate() {
        if ch < source_channels {
            for (frame, dst) in region.iter_mut().enumerate() {
                *dst = interleaved[frame * source_channels + ch];
            }
        } else {
            region.fill(0.0);
        }
    }
}
