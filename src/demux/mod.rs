//! Packet-side boundary: what the demuxer hands to the subtitle decoder.

/// Subtitle packets and codec descriptions.
pub mod packet;
/// Packet source trait and built-in sources.
pub mod source;
