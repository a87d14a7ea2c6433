mod bandwidth;
mod packet_loss;
pub(crate) mod sample;

pub use self::{
    bandwidth::Bandwidth,
    packet_loss::{PacketLoss, PacketLossParseError, PacketLossRate, PacketLossRateError},
};
