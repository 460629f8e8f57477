use crate::demux::packet::SubPacket;
use crate::foundation::error::SubError;
use std::collections::VecDeque;
use std::sync::mpsc;

/// Outcome of a non-blocking packet read.
#[derive(Debug)]
pub enum ReadStatus {
    /// The next packet in presentation order.
    Packet(SubPacket),
    /// No packet is available yet; try again once the demuxer signals new data.
    Wait,
    /// The stream has ended.
    Eof,
    /// Reading failed. The stream is treated as ended for this read.
    Failed(SubError),
}

/// Supplier of subtitle packets in presentation order.
pub trait PacketSource: Send {
    /// Read the next packet, blocking until one is available. `None` means end of stream.
    fn read_packet(&mut self) -> Option<SubPacket>;

    /// Read the next packet without blocking.
    fn read_packet_async(&mut self) -> ReadStatus;
}

/// Fully buffered source: every packet is known up front and reads never stall.
#[derive(Debug, Default)]
pub struct VecPacketSource {
    packets: VecDeque<SubPacket>,
}

impl VecPacketSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a packet to the end of the stream.
    pub fn push(&mut self, packet: SubPacket) {
        self.packets.push_back(packet);
    }

    /// Packets not read yet.
    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl From<Vec<SubPacket>> for VecPacketSource {
    fn from(packets: Vec<SubPacket>) -> Self {
        Self {
            packets: packets.into(),
        }
    }
}

impl PacketSource for VecPacketSource {
    fn read_packet(&mut self) -> Option<SubPacket> {
        self.packets.pop_front()
    }

    fn read_packet_async(&mut self) -> ReadStatus {
        match self.packets.pop_front() {
            Some(packet) => ReadStatus::Packet(packet),
            None => ReadStatus::Eof,
        }
    }
}

/// Sending half of a [`ChannelPacketSource`]. Dropping every sender ends the stream.
pub type PacketSender = mpsc::Sender<SubPacket>;

/// Source fed from another thread (e.g. a demuxer) through a channel.
///
/// Non-blocking reads report [`ReadStatus::Wait`] while the channel is empty but still connected.
#[derive(Debug)]
pub struct ChannelPacketSource {
    rx: mpsc::Receiver<SubPacket>,
}

impl ChannelPacketSource {
    /// Create a connected sender/source pair.
    pub fn channel() -> (PacketSender, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl PacketSource for ChannelPacketSource {
    fn read_packet(&mut self) -> Option<SubPacket> {
        self.rx.recv().ok()
    }

    fn read_packet_async(&mut self) -> ReadStatus {
        match self.rx.try_recv() {
            Ok(packet) => ReadStatus::Packet(packet),
            Err(mpsc::TryRecvError::Empty) => ReadStatus::Wait,
            Err(mpsc::TryRecvError::Disconnected) => ReadStatus::Eof,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/demux/source.rs"]
mod tests;
