//! Pure encoders/decoders for the vendor wire format (§4.1).

pub mod descriptor;
pub mod frames;

pub use descriptor::{parse_session_descriptor, StreamEndpoint};
pub use frames::{auth_frames, KEEPALIVE_FRAME};
