//! Probe wire format
//!
//! The injector sends an 8-byte little-endian timestamp (nanoseconds since
//! the Unix epoch). The reflector never parses payloads and echoes them
//! byte for byte, so the echo carries the same timestamp back.

/// Length of a probe timestamp on the wire
pub const TIMESTAMP_LEN: usize = 8;

/// Encode a probe timestamp
pub fn encode_timestamp(unix_nanos: u64) -> [u8; TIMESTAMP_LEN] {
    unix_nanos.to_le_bytes()
}

/// Decode the leading timestamp of an echo
///
/// Returns None if fewer than 8 bytes came back. Trailing bytes are ignored.
pub fn decode_timestamp(data: &[u8]) -> Option<u64> {
    let bytes: [u8; TIMESTAMP_LEN] = data.get(..TIMESTAMP_LEN)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}
