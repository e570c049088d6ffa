//! Opcode dispatch and the variable-length command grammar (spec.md §4.4).
//!
//! Mirrors the opcode-enum style the teacher uses for its own IPC
//! dispatch (`services/com/src/api.rs`, `services/keyboard/src/api.rs`):
//! a `#[derive(FromPrimitive)]` enum converted from the raw opcode byte,
//! matched exhaustively. Any byte that doesn't map to a known opcode, or
//! a known opcode with a payload of the wrong size, yields `None` — the
//! decoder never fails fatally (spec.md §4.4, §7 "decode").

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Waveform samples never exceed this length (spec.md §4.4).
pub const MAX_WAVEFORM_SAMPLES: usize = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 0xFF, g: 0xFF, b: 0xFF };
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    DrawRectangle { pos: Position, size: Size, color: Color },
    DrawCharacter { ch: u8, pos: Position, fg: Color, bg: Color },
    DrawOscilloscope { color: Color, samples: Vec<u8> },
    /// Controller state echoed back by the device; accepted but, per
    /// spec.md §4.4, not acted upon by this core.
    JoypadState,
    SetFontMode(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum Opcode {
    DrawRectangle = 0xFE,
    DrawCharacter = 0xFD,
    DrawOscilloscope = 0xFC,
    JoypadState = 0xFB,
    SystemInfo = 0xFF,
}

fn le16(data: &[u8], start: usize) -> u16 {
    u16::from_le_bytes([data[start], data[start + 1]])
}

/// Decodes packets into drawing commands, carrying the one piece of state
/// the grammar requires: the sticky rectangle color (spec.md §4.4, §9).
pub struct CommandDecoder {
    sticky_color: Color,
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDecoder {
    /// Initializes sticky color to opaque white, matching the device's
    /// observable startup behavior (spec.md §9).
    pub fn new() -> Self {
        CommandDecoder { sticky_color: Color::WHITE }
    }

    /// Decodes one packet. Returns `None` if the packet is empty, has an
    /// unknown opcode, or has a payload size that doesn't match any
    /// variant of its opcode — in every such case the packet is silently
    /// dropped and the decoder's state is left untouched.
    pub fn decode(&mut self, packet: &[u8]) -> Option<Command> {
        let opcode = Opcode::from_u8(*packet.first()?);
        match opcode? {
            Opcode::DrawRectangle => self.decode_rectangle(packet),
            Opcode::DrawCharacter => Self::decode_character(packet),
            Opcode::DrawOscilloscope => Self::decode_oscilloscope(packet),
            Opcode::JoypadState => (packet.len() == 3).then_some(Command::JoypadState),
            Opcode::SystemInfo => Self::decode_system_info(packet),
        }
    }

    fn decode_rectangle(&mut self, p: &[u8]) -> Option<Command> {
        if p.len() < 5 {
            return None;
        }
        let pos = Position { x: le16(p, 1), y: le16(p, 3) };
        let (size, color) = match p.len() {
            5 => (Size { width: 1, height: 1 }, self.sticky_color),
            8 => {
                let color = Color { r: p[5], g: p[6], b: p[7] };
                self.sticky_color = color;
                (Size { width: 1, height: 1 }, color)
            }
            9 => (Size { width: le16(p, 5), height: le16(p, 7) }, self.sticky_color),
            12 => {
                let color = Color { r: p[9], g: p[10], b: p[11] };
                self.sticky_color = color;
                (Size { width: le16(p, 5), height: le16(p, 7) }, color)
            }
            _ => return None,
        };
        Some(Command::DrawRectangle { pos, size, color })
    }

    fn decode_character(p: &[u8]) -> Option<Command> {
        if p.len() != 12 {
            return None;
        }
        Some(Command::DrawCharacter {
            ch: p[1],
            pos: Position { x: le16(p, 2), y: le16(p, 4) },
            fg: Color { r: p[6], g: p[7], b: p[8] },
            bg: Color { r: p[9], g: p[10], b: p[11] },
        })
    }

    fn decode_oscilloscope(p: &[u8]) -> Option<Command> {
        if p.len() < 4 || p.len() > 4 + MAX_WAVEFORM_SAMPLES {
            return None;
        }
        Some(Command::DrawOscilloscope {
            color: Color { r: p[1], g: p[2], b: p[3] },
            samples: p[4..].to_vec(),
        })
    }

    fn decode_system_info(p: &[u8]) -> Option<Command> {
        if p.len() != 6 {
            return None;
        }
        Some(Command::SetFontMode(p[5]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pixel_rectangle() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFE, 0x0A, 0x00, 0x05, 0x00, 0x80, 0x40, 0x20];
        let cmd = decoder.decode(&packet).unwrap();
        assert_eq!(
            cmd,
            Command::DrawRectangle {
                pos: Position { x: 10, y: 5 },
                size: Size { width: 1, height: 1 },
                color: Color { r: 0x80, g: 0x40, b: 0x20 },
            }
        );
    }

    #[test]
    fn sized_rectangle() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFE, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0xFF, 0xFF, 0xFF];
        let cmd = decoder.decode(&packet).unwrap();
        assert_eq!(
            cmd,
            Command::DrawRectangle {
                pos: Position { x: 0, y: 0 },
                size: Size { width: 2, height: 2 },
                color: Color { r: 0xFF, g: 0xFF, b: 0xFF },
            }
        );
    }

    #[test]
    fn sticky_color_carries_across_packets() {
        let mut decoder = CommandDecoder::new();
        // 8-byte variant sets the sticky color to red.
        let set_color = [0xFE, 0, 0, 0, 0, 0xFF, 0x00, 0x00];
        decoder.decode(&set_color).unwrap();
        // 5-byte variant must reuse that color.
        let implicit_color = [0xFE, 1, 0, 1, 0];
        let cmd = decoder.decode(&implicit_color).unwrap();
        assert_eq!(
            cmd,
            Command::DrawRectangle {
                pos: Position { x: 1, y: 1 },
                size: Size { width: 1, height: 1 },
                color: Color { r: 0xFF, g: 0, b: 0 },
            }
        );
    }

    #[test]
    fn sticky_color_starts_opaque_white() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFE, 0, 0, 0, 0];
        let cmd = decoder.decode(&packet).unwrap();
        assert_eq!(
            cmd,
            Command::DrawRectangle {
                pos: Position::default(),
                size: Size { width: 1, height: 1 },
                color: Color::WHITE,
            }
        );
    }

    #[test]
    fn rectangle_with_invalid_size_is_dropped() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFE, 0, 0, 0, 0, 0, 0]; // 7 bytes: not one of the 4 valid sizes
        assert_eq!(decoder.decode(&packet), None);
    }

    #[test]
    fn character_command() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFD, 0x41, 0, 0, 0, 0, 0xFF, 0, 0, 0, 0, 0];
        let cmd = decoder.decode(&packet).unwrap();
        assert_eq!(
            cmd,
            Command::DrawCharacter {
                ch: 0x41,
                pos: Position { x: 0, y: 0 },
                fg: Color { r: 0xFF, g: 0, b: 0 },
                bg: Color { r: 0, g: 0, b: 0 },
            }
        );
    }

    #[test]
    fn waveform_command() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFC, 0x00, 0xFF, 0x00, 0x10, 0x20, 0x30];
        let cmd = decoder.decode(&packet).unwrap();
        assert_eq!(
            cmd,
            Command::DrawOscilloscope {
                color: Color { r: 0, g: 0xFF, b: 0 },
                samples: vec![0x10, 0x20, 0x30],
            }
        );
    }

    #[test]
    fn waveform_over_max_samples_is_dropped() {
        let mut decoder = CommandDecoder::new();
        let mut packet = vec![0xFC, 0, 0xFF, 0];
        packet.extend(std::iter::repeat(0u8).take(MAX_WAVEFORM_SAMPLES + 1));
        assert_eq!(decoder.decode(&packet), None);
    }

    #[test]
    fn font_switch_command() {
        let mut decoder = CommandDecoder::new();
        let packet = [0xFF, 0, 0, 0, 0, 1];
        assert_eq!(decoder.decode(&packet), Some(Command::SetFontMode(1)));
    }

    #[test]
    fn unknown_opcode_is_ignored() {
        let mut decoder = CommandDecoder::new();
        assert_eq!(decoder.decode(&[0x01, 0x02, 0x03]), None);
    }

    #[test]
    fn empty_packet_is_ignored() {
        let mut decoder = CommandDecoder::new();
        assert_eq!(decoder.decode(&[]), None);
    }

    #[test]
    fn decoder_is_total_over_arbitrary_bytes() {
        let mut decoder = CommandDecoder::new();
        for len in 0..16usize {
            for seed in 0..8u8 {
                let packet: Vec<u8> = (0..len).map(|i| seed.wrapping_add(i as u8)).collect();
                // Must not panic for any length/content combination.
                let _ = decoder.decode(&packet);
            }
        }
    }
}
