//! AMD Wraith Prism lighting protocol.
//!
//! Byte layouts reverse engineered by Adam Honse's OpenRGB
//! (https://gitlab.com/CalcProgrammer1/OpenRGB) and gfduszynski's cm-rgb
//! (https://github.com/gfduszynski/cm-rgb).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Error;

/// USB vendor ID of the Wraith Prism controller.
pub const VENDOR_ID: u16 = 0x2516;

/// USB product ID of the Wraith Prism controller.
pub const PRODUCT_ID: u16 = 0x0051;

/// USB interface carrying the lighting endpoint.
pub const INTERFACE: i32 = 1;

/// Command frames are always 65 bytes, including the report ID.
pub const CMD_SIZE: usize = 65;

/// Every command is answered with a 64 byte reply.
pub const REPLY_SIZE: usize = 64;

/// Number of individually mappable ring LEDs.
pub const RING_SLOTS: usize = 15;

/// Effect flag selecting the fixed primary colour, the default when no flags
/// are given. Other bits: 0x80 random colour, 0x40 blend, 0x01 reverse.
pub const FLAG_FIXED_COLOUR: u8 = 0x20;

/// Speed byte used by static effects.
const STATIC_SPEED: u8 = 0xFF;

// Per-mode speed bytes, indexed by level 1 (slowest) to 5 (fastest).
const BREATH_SPEED: [u8; 5] = [0x3C, 0x37, 0x31, 0x2C, 0x26];
const CYCLE_SPEED: [u8; 5] = [0x96, 0x8C, 0x80, 0x6E, 0x68];
const RAINBOW_SPEED: [u8; 5] = [0x72, 0x68, 0x64, 0x62, 0x61];
const CHASE_SPEED: [u8; 5] = [0x77, 0x74, 0x6E, 0x6B, 0x67];
const SWIRL_SPEED: [u8; 5] = [0x77, 0x74, 0x6E, 0x6B, 0x67];

/// Addressable LED zone or ring animation selector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Channel {
    Logo,
    Fan,
    RingStatic,
    RingBreath,
    RingColourCycle,
    RingRainbow,
    RingBounce,
    RingChase,
    RingSwirl,
    RingMorse,
    Off,
}

impl Channel {
    /// Firmware identifier of the channel.
    pub fn id(self) -> u8 {
        match self {
            Channel::Logo => 0x05,
            Channel::Fan => 0x06,
            Channel::RingStatic => 0x00,
            Channel::RingBreath => 0x01,
            Channel::RingColourCycle => 0x02,
            Channel::RingRainbow => 0x07,
            Channel::RingBounce => 0x08,
            Channel::RingChase => 0x09,
            Channel::RingSwirl => 0x0A,
            Channel::RingMorse => 0x0B,
            Channel::Off => 0xFE,
        }
    }

    /// Resolve the name of a directly addressed zone.
    pub fn fixed_from_name(name: &str) -> Result<Channel, Error> {
        match name {
            "logo" => Ok(Channel::Logo),
            "fan" => Ok(Channel::Fan),
            _ => Err(Error::InvalidParameter(format!("unknown channel: {name}"))),
        }
    }

    /// Resolve the name of a ring animation channel.
    pub fn ring_from_name(name: &str) -> Result<Channel, Error> {
        match name {
            "static" => Ok(Channel::RingStatic),
            "cycle" => Ok(Channel::RingColourCycle),
            "breath" => Ok(Channel::RingBreath),
            "rainbow" => Ok(Channel::RingRainbow),
            "bounce" => Ok(Channel::RingBounce),
            "chase" => Ok(Channel::RingChase),
            "swirl" => Ok(Channel::RingSwirl),
            "morse" => Ok(Channel::RingMorse),
            "off" => Ok(Channel::Off),
            _ => Err(Error::InvalidParameter(format!("unknown ring channel: {name}"))),
        }
    }
}

/// Firmware animation algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Static,
    ColourCycle,
    Breath,
    RingRainbow,
    RingChase,
    RingSwirl,
    RingDefault,
}

impl Mode {
    /// Firmware identifier of the mode.
    pub fn id(self) -> u8 {
        match self {
            Mode::Static => 0x01,
            Mode::ColourCycle => 0x02,
            Mode::Breath => 0x03,
            Mode::RingRainbow => 0x05,
            Mode::RingChase => 0xC3,
            Mode::RingSwirl => 0x4A,
            Mode::RingDefault => 0xFF,
        }
    }

    /// Resolve a logo or fan mode name.
    pub fn from_name(name: &str) -> Result<Mode, Error> {
        match name {
            "static" => Ok(Mode::Static),
            "cycle" => Ok(Mode::ColourCycle),
            "breath" => Ok(Mode::Breath),
            _ => Err(Error::InvalidParameter(format!("unknown mode: {name}"))),
        }
    }
}

/// Map a 1-5 speed level onto the firmware byte of an animation table.
fn table_speed(table: &[u8; 5], level: u8) -> Result<u8, Error> {
    match level {
        1..=5 => Ok(table[usize::from(level - 1)]),
        _ => Err(Error::InvalidParameter(format!("speed {level} out of range 1 to 5"))),
    }
}

/// Speed byte for a logo or fan effect mode.
pub fn mode_speed(mode: Mode, level: u8) -> Result<u8, Error> {
    match mode {
        Mode::Static => Ok(STATIC_SPEED),
        Mode::ColourCycle => table_speed(&CYCLE_SPEED, level),
        Mode::Breath => table_speed(&BREATH_SPEED, level),
        mode => Err(Error::InvalidParameter(format!("{mode:?} is not a logo or fan mode"))),
    }
}

/// Animation mode and speed byte run by a ring channel.
pub fn ring_mode_speed(channel: Channel, level: u8) -> Result<(Mode, u8), Error> {
    match channel {
        Channel::RingStatic => Ok((Mode::RingDefault, STATIC_SPEED)),
        Channel::RingColourCycle => Ok((Mode::RingDefault, table_speed(&CYCLE_SPEED, level)?)),
        Channel::RingBreath => Ok((Mode::Breath, table_speed(&BREATH_SPEED, level)?)),
        Channel::RingRainbow => Ok((Mode::RingRainbow, table_speed(&RAINBOW_SPEED, level)?)),
        Channel::RingBounce => Ok((Mode::RingDefault, 0x00)),
        Channel::RingChase => Ok((Mode::RingChase, table_speed(&CHASE_SPEED, level)?)),
        Channel::RingSwirl => Ok((Mode::RingSwirl, table_speed(&SWIRL_SPEED, level)?)),
        Channel::RingMorse => Ok((Mode::RingRainbow, 0x00)),
        channel => {
            Err(Error::InvalidParameter(format!("channel {channel:?} cannot run an effect")))
        },
    }
}

/// RGB colour.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parameters of one effect update frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Effect {
    channel: Channel,
    speed: u8,
    flags: u8,
    mode: Mode,
    brightness: u8,
    colour1: Rgb,
    colour2: Rgb,
}

impl Effect {
    /// Effect for the logo or fan zone.
    pub fn fixed(
        channel: Channel,
        mode: Mode,
        level: u8,
        brightness: u8,
        colour1: Rgb,
        colour2: Rgb,
        flags: u8,
    ) -> Result<Effect, Error> {
        match channel {
            Channel::Logo | Channel::Fan => (),
            channel => {
                return Err(Error::InvalidParameter(format!("channel {channel:?} is not a zone")))
            },
        }

        let speed = mode_speed(mode, level)?;
        Ok(Effect { channel, speed, flags, mode, brightness, colour1, colour2 })
    }

    /// Effect for one of the ring animation channels.
    pub fn ring(
        channel: Channel,
        level: u8,
        brightness: u8,
        colour1: Rgb,
        colour2: Rgb,
        flags: u8,
    ) -> Result<Effect, Error> {
        let (mode, speed) = ring_mode_speed(channel, level)?;
        Ok(Effect { channel, speed, flags, mode, brightness, colour1, colour2 })
    }
}

/// Assignment of channels to the physical LED segments.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    logo: Channel,
    fan: Channel,
    ring: [Channel; RING_SLOTS],
}

impl ChannelMap {
    /// Build a map from up to 15 ring assignments.
    ///
    /// Missing slots repeat the last supplied channel.
    pub fn new(logo: Channel, fan: Channel, ring: &[Channel]) -> Result<ChannelMap, Error> {
        let (&last, _) = ring
            .split_last()
            .ok_or_else(|| Error::InvalidParameter("ring map needs at least one channel".into()))?;

        if ring.len() > RING_SLOTS {
            return Err(Error::InvalidParameter(format!(
                "ring map holds at most {RING_SLOTS} channels"
            )));
        }

        let mut slots = [last; RING_SLOTS];
        slots[..ring.len()].copy_from_slice(ring);

        Ok(ChannelMap { logo, fan, ring: slots })
    }
}

/// Encode a mirage frequency in Hz into its three byte firmware form.
///
/// Zero encodes the fixed "disabled" triple. The arithmetic mirrors what the
/// firmware expects, including the 0.75 divisor offset, truncation at every
/// step and the integer part wrapping through a byte; the output order is
/// divisor, fractional part, integer part.
pub fn hz_to_bytes(hz: u32) -> [u8; 3] {
    if hz == 0 {
        return [0x00, 0xFF, 0x4A];
    }

    let v = 1_500_000.0 / hz as f32;
    let m = (v / 256.0) as u32;
    let r = v / (m as f32 + 0.75);
    let r0 = r as u32;
    let r1 = ((r - r0 as f32) * 256.0) as u32;

    [if m < 255 { m as u8 } else { 255 }, r1 as u8, r0 as u8]
}

/// One requested device operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    EffectUpdate(Effect),
    ChannelMap(ChannelMap),
    Mirage { red_hz: u32, green_hz: u32, blue_hz: u32 },
    QueryChannel(u8),
}

impl Operation {
    /// Build the command frame for this operation.
    pub fn frame(&self) -> Bytes {
        match self {
            Operation::EffectUpdate(effect) => effect_frame(effect),
            Operation::ChannelMap(map) => channel_map_frame(map),
            Operation::Mirage { red_hz, green_hz, blue_hz } => {
                mirage_frame(*red_hz, *green_hz, *blue_hz)
            },
            Operation::QueryChannel(channel) => query_frame(*channel),
        }
    }

    /// Whether the operation changes state that a later commit applies.
    pub fn commits(&self) -> bool {
        !matches!(self, Operation::QueryChannel(_))
    }
}

/// Controller enable frame, sent before any other command.
pub fn enable_frame() -> Bytes {
    let mut buf = BytesMut::with_capacity(CMD_SIZE);

    // Report ID and opcode.
    buf.put_slice(&[0x00, 0x41, 0x80]);

    // Padding.
    buf.put_bytes(0x00, CMD_SIZE - 3);

    buf.freeze()
}

/// Commit frame applying all previously written settings.
pub fn apply_frame() -> Bytes {
    let mut buf = BytesMut::with_capacity(CMD_SIZE);

    buf.put_slice(&[0x00, 0x51, 0x28, 0x00, 0x00, 0xE0]);

    // Padding.
    buf.put_bytes(0x00, CMD_SIZE - 6);

    buf.freeze()
}

/// Effect update frame for one channel.
fn effect_frame(effect: &Effect) -> Bytes {
    let mut buf = BytesMut::with_capacity(CMD_SIZE);

    // Report ID and opcode.
    buf.put_slice(&[0x00, 0x51, 0x2C, 0x01, 0x00]);

    buf.put_u8(effect.channel.id());
    buf.put_u8(effect.speed);
    buf.put_u8(effect.flags);
    buf.put_u8(effect.mode.id());

    // Undocumented marker.
    buf.put_u8(0xFF);

    buf.put_u8(effect.brightness);

    // Primary colour.
    buf.put_u8(effect.colour1.r);
    buf.put_u8(effect.colour1.g);
    buf.put_u8(effect.colour1.b);

    // Secondary colour.
    buf.put_u8(effect.colour2.r);
    buf.put_u8(effect.colour2.g);
    buf.put_u8(effect.colour2.b);

    // This frame pads with 0xFF rather than zeroes.
    buf.put_bytes(0xFF, CMD_SIZE - 17);

    buf.freeze()
}

/// Channel map frame assigning every LED segment its channel.
fn channel_map_frame(map: &ChannelMap) -> Bytes {
    let mut buf = BytesMut::with_capacity(CMD_SIZE);

    // Report ID and opcode.
    buf.put_slice(&[0x00, 0x51, 0xA0, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00]);

    buf.put_u8(map.logo.id());
    buf.put_u8(map.fan.id());

    for channel in map.ring.iter() {
        buf.put_u8(channel.id());
    }

    // Padding.
    buf.put_bytes(0x00, CMD_SIZE - 11 - RING_SLOTS);

    buf.freeze()
}

/// Mirage frequency programming frame.
fn mirage_frame(red_hz: u32, green_hz: u32, blue_hz: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(CMD_SIZE);

    // Report ID and opcode.
    buf.put_slice(&[0x00, 0x51, 0x71, 0x00, 0x00]);

    // Four colour banks, the first permanently disabled.
    for &(select, hz) in &[(0x01u8, 0u32), (0x02, red_hz), (0x03, green_hz), (0x04, blue_hz)] {
        buf.put_u8(select);
        buf.put_slice(&hz_to_bytes(hz));
    }

    // Padding.
    buf.put_bytes(0x00, CMD_SIZE - 21);

    buf.freeze()
}

/// Read-only channel state probe.
fn query_frame(channel: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(CMD_SIZE);

    buf.put_slice(&[0x00, 0x40, 0x21]);
    buf.put_u8(channel);

    // Padding.
    buf.put_bytes(0x00, CMD_SIZE - 4);

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logo_static() -> Effect {
        Effect::fixed(
            Channel::Logo,
            Mode::Static,
            1,
            0xFF,
            Rgb { r: 0xFF, g: 0x00, b: 0x00 },
            Rgb::default(),
            FLAG_FIXED_COLOUR,
        )
        .unwrap()
    }

    #[test]
    fn frames_are_fixed_size() {
        let map = ChannelMap::new(Channel::Logo, Channel::Fan, &[Channel::RingStatic]).unwrap();

        assert_eq!(enable_frame().len(), CMD_SIZE);
        assert_eq!(apply_frame().len(), CMD_SIZE);
        assert_eq!(Operation::EffectUpdate(logo_static()).frame().len(), CMD_SIZE);
        assert_eq!(Operation::ChannelMap(map).frame().len(), CMD_SIZE);
        assert_eq!(
            Operation::Mirage { red_hz: 330, green_hz: 330, blue_hz: 330 }.frame().len(),
            CMD_SIZE
        );
        assert_eq!(Operation::QueryChannel(0x05).frame().len(), CMD_SIZE);
    }

    #[test]
    fn enable_frame_layout() {
        let frame = enable_frame();

        assert_eq!(frame[..3], [0x00, 0x41, 0x80]);
        assert!(frame[3..].iter().all(|&byte| byte == 0x00));
    }

    #[test]
    fn apply_frame_layout() {
        let frame = apply_frame();

        assert_eq!(frame[..6], [0x00, 0x51, 0x28, 0x00, 0x00, 0xE0]);
        assert!(frame[6..].iter().all(|&byte| byte == 0x00));
    }

    #[test]
    fn effect_frame_layout() {
        let effect = Effect::fixed(
            Channel::Logo,
            Mode::Breath,
            3,
            0x7F,
            Rgb { r: 0x01, g: 0x02, b: 0x03 },
            Rgb { r: 0x04, g: 0x05, b: 0x06 },
            0x40,
        )
        .unwrap();
        let frame = Operation::EffectUpdate(effect).frame();

        assert_eq!(frame[..17], [
            0x00, 0x51, 0x2C, 0x01, 0x00, 0x05, 0x31, 0x40, 0x03, 0xFF, 0x7F, 0x01, 0x02, 0x03,
            0x04, 0x05, 0x06
        ]);

        // Unused offsets are transmitted as 0xFF.
        assert!(frame[17..].iter().all(|&byte| byte == 0xFF));
    }

    #[test]
    fn ring_effect_frame_layout() {
        let effect = Effect::ring(
            Channel::RingChase,
            2,
            0xC8,
            Rgb { r: 0x10, g: 0x20, b: 0x30 },
            Rgb::default(),
            FLAG_FIXED_COLOUR,
        )
        .unwrap();
        let frame = Operation::EffectUpdate(effect).frame();

        // Channel 0x09 runs the chase mode 0xC3 at the level 2 speed byte.
        assert_eq!(frame[5], 0x09);
        assert_eq!(frame[6], 0x74);
        assert_eq!(frame[7], FLAG_FIXED_COLOUR);
        assert_eq!(frame[8], 0xC3);
    }

    #[test]
    fn ring_channel_mode_mapping() {
        assert_eq!(ring_mode_speed(Channel::RingStatic, 1).unwrap(), (Mode::RingDefault, 0xFF));
        assert_eq!(ring_mode_speed(Channel::RingBounce, 4).unwrap(), (Mode::RingDefault, 0x00));
        assert_eq!(ring_mode_speed(Channel::RingMorse, 4).unwrap(), (Mode::RingRainbow, 0x00));
        assert_eq!(ring_mode_speed(Channel::RingSwirl, 5).unwrap(), (Mode::RingSwirl, 0x67));
        assert!(ring_mode_speed(Channel::Off, 3).is_err());
        assert!(ring_mode_speed(Channel::Logo, 3).is_err());
    }

    #[test]
    fn speed_level_bounds() {
        assert!(mode_speed(Mode::Breath, 0).is_err());
        assert!(mode_speed(Mode::Breath, 6).is_err());
        assert_eq!(mode_speed(Mode::Breath, 3).unwrap(), 0x31);
        assert_eq!(mode_speed(Mode::ColourCycle, 1).unwrap(), 0x96);

        // Static ignores the level entirely.
        assert_eq!(mode_speed(Mode::Static, 1).unwrap(), 0xFF);
    }

    #[test]
    fn channel_map_right_fill() {
        let ring = [Channel::RingStatic, Channel::RingBreath, Channel::RingChase];
        let map = ChannelMap::new(Channel::Logo, Channel::Fan, &ring).unwrap();
        let frame = Operation::ChannelMap(map).frame();

        assert_eq!(frame[..9], [0x00, 0x51, 0xA0, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00]);
        assert_eq!(frame[9], 0x05);
        assert_eq!(frame[10], 0x06);
        assert_eq!(frame[11..14], [0x00, 0x01, 0x09]);

        // Slots 3 to 14 replicate the last supplied channel.
        assert!(frame[14..26].iter().all(|&byte| byte == 0x09));
        assert!(frame[26..].iter().all(|&byte| byte == 0x00));
    }

    #[test]
    fn channel_map_bounds() {
        assert!(ChannelMap::new(Channel::Logo, Channel::Fan, &[]).is_err());
        assert!(ChannelMap::new(Channel::Logo, Channel::Fan, &[Channel::Off; 16]).is_err());
        assert!(ChannelMap::new(Channel::Logo, Channel::Fan, &[Channel::Off; 15]).is_ok());
    }

    #[test]
    fn hz_encoding_disabled() {
        assert_eq!(hz_to_bytes(0), [0x00, 0xFF, 0x4A]);
    }

    #[test]
    fn hz_encoding_reference() {
        // 1000 Hz: v = 1500, divisor 5, remainder 1500 / 5.75 = 260.8695...,
        // integer part 260 wraps to 0x04, fraction 0.8695 scales to 0xDE.
        assert_eq!(hz_to_bytes(1000), [0x05, 0xDE, 0x04]);
        assert_eq!(hz_to_bytes(1000), hz_to_bytes(1000));
    }

    #[test]
    fn mirage_frame_layout() {
        let frame =
            Operation::Mirage { red_hz: 1000, green_hz: 0, blue_hz: 0 }.frame();

        assert_eq!(frame[..5], [0x00, 0x51, 0x71, 0x00, 0x00]);

        // Bank one is always disabled.
        assert_eq!(frame[5], 0x01);
        assert_eq!(frame[6..9], [0x00, 0xFF, 0x4A]);

        assert_eq!(frame[9], 0x02);
        assert_eq!(frame[10..13], [0x05, 0xDE, 0x04]);
        assert_eq!(frame[13], 0x03);
        assert_eq!(frame[14..17], [0x00, 0xFF, 0x4A]);
        assert_eq!(frame[17], 0x04);
        assert_eq!(frame[18..21], [0x00, 0xFF, 0x4A]);
        assert!(frame[21..].iter().all(|&byte| byte == 0x00));
    }

    #[test]
    fn query_frame_layout() {
        let frame = Operation::QueryChannel(0x0B).frame();

        assert_eq!(frame[..4], [0x00, 0x40, 0x21, 0x0B]);
        assert!(frame[4..].iter().all(|&byte| byte == 0x00));
    }

    #[test]
    fn query_does_not_commit() {
        assert!(!Operation::QueryChannel(0x00).commits());
        assert!(Operation::EffectUpdate(logo_static()).commits());
    }

    #[test]
    fn effect_rejects_foreign_channels() {
        let colour = Rgb::default();
        assert!(Effect::fixed(Channel::RingChase, Mode::Static, 1, 0, colour, colour, 0).is_err());
    }
}
