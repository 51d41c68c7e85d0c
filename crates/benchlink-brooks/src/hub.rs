//! `Brooks0254` -- the unit as a whole.
//!
//! The hub owns the bus [`Link`] and the unit's network address. It hands out
//! [`BrooksChannel`] facades that share the link, and exposes the unit-wide
//! settings that live on port 9.

use tracing::debug;

use benchlink_core::error::Result;
use benchlink_core::link::Link;
use benchlink_core::scaling::DecimalPoint;
use benchlink_core::types::{Channel, InstrumentInfo, Protocol, Value};

use crate::channel::{BrooksChannel, MANUFACTURER};
use crate::params::{self, BrooksParam};
use crate::protocol::{self, Op};
use crate::transceive::transceive;

/// A Brooks 0254 four-channel secondary electronics unit.
pub struct Brooks0254 {
    link: Link,
    address: Option<u32>,
    info: InstrumentInfo,
}

impl Brooks0254 {
    /// Wrap an open link. `address` is the unit's network address, or
    /// `None` on a single-unit bus.
    pub fn new(link: Link, address: Option<u32>) -> Result<Self> {
        let address = address.map(protocol::check_address).transpose()?;
        Ok(Brooks0254 {
            link,
            address,
            info: InstrumentInfo {
                manufacturer: MANUFACTURER,
                model: "0254".into(),
                protocol: Protocol::AsciiMultidrop,
            },
        })
    }

    /// Static identification of the unit.
    pub fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    /// Network address used in commands.
    pub fn address(&self) -> Option<u32> {
        self.address
    }

    /// The shared bus link, e.g. to attach a second unit on the same bus.
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Open channel `number` (1..=4). The channel shares this unit's link and
    /// reads its decimal point on open.
    pub async fn channel(&self, number: u8) -> Result<BrooksChannel> {
        let channel = Channel::new(number)?;
        BrooksChannel::open(self.link.clone(), channel, self.address).await
    }

    async fn read_global(&self, param: BrooksParam) -> Result<Value> {
        let spec = param.spec();
        let request =
            protocol::encode_command(self.address, protocol::GLOBAL_PORT, spec.code, Op::Read);
        let response = transceive(&self.link, &request).await?;
        let value = params::decode_value(param, response.payload(), DecimalPoint::Zero)?;
        debug!(code = spec.code, %value, "read {param}");
        Ok(value)
    }

    async fn write_global(&self, param: BrooksParam, value: Value) -> Result<()> {
        let spec = param.spec();
        let wire = params::encode_value(param, &value, DecimalPoint::Zero)?;
        let request = protocol::encode_command(
            self.address,
            protocol::GLOBAL_PORT,
            spec.code,
            Op::Write(&wire),
        );
        transceive(&self.link, &request).await?;
        debug!(code = spec.code, %value, "wrote {param}");
        Ok(())
    }

    async fn flag(&self, param: BrooksParam) -> Result<bool> {
        self.read_global(param).await?.expect_flag(param.name())
    }

    /// Keypad beep.
    pub async fn audio_beep(&self) -> Result<bool> {
        self.flag(BrooksParam::AudioBeep).await
    }

    /// Enable or disable the keypad beep.
    pub async fn set_audio_beep(&self, on: bool) -> Result<()> {
        self.write_global(BrooksParam::AudioBeep, Value::Flag(on)).await
    }

    /// Zero suppression.
    pub async fn zero_suppress(&self) -> Result<bool> {
        self.flag(BrooksParam::ZeroSuppress).await
    }

    /// Enable or disable zero suppression.
    pub async fn set_zero_suppress(&self, on: bool) -> Result<()> {
        self.write_global(BrooksParam::ZeroSuppress, Value::Flag(on)).await
    }

    /// Whether setpoints are cleared on power-up.
    pub async fn power_sp_clear(&self) -> Result<bool> {
        self.flag(BrooksParam::PowerSetpointClear).await
    }

    /// Choose whether setpoints are cleared on power-up.
    pub async fn set_power_sp_clear(&self, on: bool) -> Result<()> {
        self.write_global(BrooksParam::PowerSetpointClear, Value::Flag(on))
            .await
    }

    /// Network address as reported by the unit, uninterpreted.
    pub async fn network_address(&self) -> Result<String> {
        match self.read_global(BrooksParam::NetworkAddress).await? {
            Value::Token(token) => Ok(token),
            other => Ok(other.to_string()),
        }
    }

    /// Release the bus. Channels opened from this hub stop working too.
    pub async fn close(&self) -> Result<()> {
        self.link.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::error::Error;
    use benchlink_core::Instrument;
    use benchlink_test_harness::MockTransport;
    use std::time::Duration;

    fn hub(mock: MockTransport, address: Option<u32>) -> Brooks0254 {
        let link = Link::new(Box::new(mock), Duration::from_millis(100));
        Brooks0254::new(link, address).unwrap()
    }

    #[tokio::test]
    async fn global_flags_use_port_nine() {
        let mut mock = MockTransport::new();
        mock.expect(b"AZ.9P39?\r", b"AZ,00000,4,39,1\r\n");
        mock.expect(b"AZ.9P32=0\r", b"AZ,00000,4,32,0\r\n");
        mock.expect(b"AZ.9P33=1\r", b"AZ,00000,4,33,1\r\n");
        let hub = hub(mock, None);

        assert!(hub.audio_beep().await.unwrap());
        hub.set_zero_suppress(false).await.unwrap();
        hub.set_power_sp_clear(true).await.unwrap();
    }

    #[tokio::test]
    async fn network_address_is_passed_through() {
        let mut mock = MockTransport::new();
        mock.expect(b"AZ00042.9P17?\r", b"AZ,00042,4,17,00042\r\n");
        let hub = hub(mock, Some(42));
        assert_eq!(hub.network_address().await.unwrap(), "00042");
    }

    #[tokio::test]
    async fn channels_share_the_link() {
        let mut mock = MockTransport::new();
        mock.expect(b"AZ.1P3?\r", b"AZ,00000,4,3,1\r\n");
        mock.expect(b"AZ.7P3?\r", b"AZ,00000,4,3,3\r\n");
        mock.expect(b"AZ.2P1?\r", b"AZ,00000,4,1,1000\r\n");
        mock.expect(b"AZ.8P1?\r", b"AZ,00000,4,1,250\r\n");
        let hub = hub(mock, None);

        let mut one = hub.channel(1).await.unwrap();
        let mut four = hub.channel(4).await.unwrap();
        assert_eq!(one.setpoint().await.unwrap(), 100.0);
        assert_eq!(four.setpoint().await.unwrap(), 0.25);
    }

    #[tokio::test]
    async fn closing_a_channel_leaves_siblings_working() {
        let mut mock = MockTransport::new();
        mock.expect(b"AZ.1P3?\r", b"AZ,00000,4,3,1\r\n");
        mock.expect(b"AZ.3P3?\r", b"AZ,00000,4,3,1\r\n");
        mock.expect(b"AZ.4P1?\r", b"AZ,00000,4,1,500\r\n");
        mock.expect(b"AZ.9P39?\r", b"AZ,00000,4,39,0\r\n");
        let hub = hub(mock, None);

        let mut one = hub.channel(1).await.unwrap();
        let mut two = hub.channel(2).await.unwrap();
        Instrument::close(&mut one).await.unwrap();

        assert!(hub.link().is_connected().await);
        assert_eq!(two.setpoint().await.unwrap(), 50.0);
        assert!(!hub.audio_beep().await.unwrap());

        hub.close().await.unwrap();
        assert!(!hub.link().is_connected().await);
        assert!(matches!(two.setpoint().await, Err(Error::TransportClosed)));
    }

    #[tokio::test]
    async fn invalid_channel_is_rejected_before_io() {
        let mock = MockTransport::new();
        let log = mock.sent_log();
        let hub = hub(mock, None);
        assert!(matches!(
            hub.channel(5).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn address_must_fit_five_digits() {
        let link = Link::new(Box::new(MockTransport::new()), Duration::from_millis(100));
        assert!(Brooks0254::new(link, Some(123_456)).is_err());
    }
}
