//! ICMP header checksum.

/// Computes the one's-complement checksum of `data`.
///
/// Byte pairs are accumulated as `low + high * 256`, so the folded sum comes
/// out byte-swapped relative to network order. The final swap puts it back,
/// and the result is meant to be written into the header big-endian.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        let word = u32::from(pair[1]) * 256 + u32::from(pair[0]);
        sum = sum.wrapping_add(word);
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add(u32::from(*last));
    }

    sum = (sum >> 16) + (sum & 0xffff);
    sum = (sum >> 16) + sum;

    let answer = !sum & 0xffff;
    ((answer >> 8) | ((answer << 8) & 0xff00)) as u16
}
