//! The five-frame TLS authentication preamble and the keep-alive frame (§4.1, §8 P3/P7).
//!
//! The meaning of frames 1, 3 and 5 is undocumented upstream; they are
//! reproduced here as opaque constants per the specification's open question.

/// Builds the five authentication frames written to the TLS stream
/// immediately after the handshake, in order.
pub fn auth_frames(conn_id: &str, client_id: u32) -> [Vec<u8>; 5] {
    let frame1 = {
        let mut buf = vec![0x00, 0x00, 0x00, 0x28];
        buf.extend_from_slice(&[0u8; 20]);
        buf
    };

    let frame2 = client_id.to_be_bytes().to_vec();

    let frame3 = {
        let mut buf = vec![0x01, 0x08];
        buf.extend_from_slice(&[0u8; 71]);
        buf.push(0x10);
        buf
    };

    let frame4 = conn_id.as_bytes().to_vec();

    let frame5 = {
        let mut buf = vec![0x00, 0x00, 0x00, 0x01, 0x0A];
        buf.extend_from_slice(&[0u8; 8]);
        buf
    };

    [frame1, frame2, frame3, frame4, frame5]
}

/// The fixed 33-byte keep-alive payload, emitted at >=1s cadence while the
/// stream is active.
pub const KEEPALIVE_FRAME: [u8; 33] = [
    0x12, 0x00, 0x00, 0x03, 0xE8, 0x00, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
    0x00,
];
