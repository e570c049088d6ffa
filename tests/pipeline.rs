//! End-to-end exercise of the receive pipeline: bytes on the wire through
//! SLIP framing, the bounded queue, opcode decoding, and drawing onto the
//! pixel buffer. Mirrors the concrete scenarios of spec.md §8.

use m8c_headless::command::{Color, Command, CommandDecoder};
use m8c_headless::display::{PixelBuffer, HEIGHT, WIDTH};
use m8c_headless::font::{Font, FontSet};
use m8c_headless::queue::{PacketQueue, DEFAULT_CAPACITY};
use m8c_headless::slip::{Framer, SLIP_MAX};

const END: u8 = 0xC0;
const ESC: u8 = 0xDB;
const ESC_END: u8 = 0xDC;
const ESC_ESC: u8 = 0xDD;

fn slip_encode(packet: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packet.len() + 2);
    for &b in packet {
        match b {
            END => out.extend([ESC, ESC_END]),
            ESC => out.extend([ESC, ESC_ESC]),
            _ => out.push(b),
        }
    }
    out.push(END);
    out
}

/// Feeds SLIP-encoded wire bytes through a framer straight into a queue,
/// the same wiring `transport::run_pump` does.
fn deliver(queue: &PacketQueue, packets: &[&[u8]]) {
    let mut framer = Framer::new(SLIP_MAX, |pkt: &[u8]| queue.push(pkt));
    for packet in packets {
        for byte in slip_encode(packet) {
            framer.read_byte(byte).expect("well-formed test packets never fail framing");
        }
    }
}

fn draw(buffer: &mut PixelBuffer, fonts: &mut FontSet, decoder: &mut CommandDecoder, packet: &[u8]) {
    let Some(command) = decoder.decode(packet) else { return };
    match command {
        Command::DrawRectangle { pos, size, color } => {
            buffer.fill_rect(pos.x as i64, pos.y as i64, size.width as i64, size.height as i64, color)
        }
        Command::DrawCharacter { ch, pos, fg, bg } => fonts.current().draw_glyph(buffer, ch, pos.x, pos.y, fg, bg),
        Command::DrawOscilloscope { color, samples } => {
            let n = samples.len() as i64;
            let x0 = WIDTH as i64 - n;
            buffer.fill_rect(x0, 0, n, HEIGHT as i64, Color { r: 0, g: 0, b: 0 });
            for (i, &s) in samples.iter().enumerate() {
                buffer.set_pixel(x0 + i as i64, s as i64, color);
            }
        }
        Command::SetFontMode(mode) => fonts.set_mode(mode),
        Command::JoypadState => {}
    }
}

#[test]
fn scenario_single_pixel_rectangle() {
    let queue = PacketQueue::new(DEFAULT_CAPACITY);
    deliver(&queue, &[&[0xFE, 0x0A, 0x00, 0x05, 0x00, 0x80, 0x40, 0x20]]);

    let mut buffer = PixelBuffer::new();
    let mut fonts = FontSet::new();
    let mut decoder = CommandDecoder::new();
    while let Some(packet) = queue.pop() {
        draw(&mut buffer, &mut fonts, &mut decoder, &packet);
    }

    assert_eq!(buffer.pixels()[5 * WIDTH + 10], 0xFF80_4020);
}

#[test]
fn scenario_sized_rectangle() {
    let queue = PacketQueue::new(DEFAULT_CAPACITY);
    deliver(&queue, &[&[0xFE, 0, 0, 0, 0, 0x02, 0x00, 0x02, 0x00, 0xFF, 0xFF, 0xFF]]);

    let mut buffer = PixelBuffer::new();
    let mut fonts = FontSet::new();
    let mut decoder = CommandDecoder::new();
    while let Some(packet) = queue.pop() {
        draw(&mut buffer, &mut fonts, &mut decoder, &packet);
    }

    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(buffer.pixels()[y * WIDTH + x], 0xFFFF_FFFF);
        }
    }
}

#[test]
fn scenario_waveform() {
    let queue = PacketQueue::new(DEFAULT_CAPACITY);
    deliver(&queue, &[&[0xFC, 0x00, 0xFF, 0x00, 0x10, 0x20, 0x30]]);

    let mut buffer = PixelBuffer::new();
    let mut fonts = FontSet::new();
    let mut decoder = CommandDecoder::new();
    while let Some(packet) = queue.pop() {
        draw(&mut buffer, &mut fonts, &mut decoder, &packet);
    }

    assert_eq!(buffer.pixels()[0x10 * WIDTH + 317], 0xFF00_FF00);
    assert_eq!(buffer.pixels()[0x20 * WIDTH + 318], 0xFF00_FF00);
    assert_eq!(buffer.pixels()[0x30 * WIDTH + 319], 0xFF00_FF00);
}

#[test]
fn scenario_font_switch_then_character() {
    let queue = PacketQueue::new(DEFAULT_CAPACITY);
    deliver(
        &queue,
        &[
            &[0xFF, 0, 0, 0, 0, 1],
            &[0xFD, 0x41, 0, 0, 0, 0, 0xFF, 0, 0, 0, 0, 0],
        ],
    );

    let mut buffer = PixelBuffer::new();
    let mut fonts = FontSet::new();
    let mut decoder = CommandDecoder::new();
    let mut packets = Vec::new();
    while let Some(packet) = queue.pop() {
        packets.push(packet);
    }
    assert_eq!(packets.len(), 2);
    for packet in &packets {
        draw(&mut buffer, &mut fonts, &mut decoder, packet);
    }

    // font mode 1 draws a 10x10 glyph cell; the origin pixel must be red.
    assert_eq!(buffer.pixels()[0], 0xFFFF_0000);
    assert_eq!(buffer.pixels()[9 * WIDTH + 9], 0xFFFF_0000);
}

#[test]
fn sticky_color_survives_the_full_wire_round_trip() {
    let queue = PacketQueue::new(DEFAULT_CAPACITY);
    deliver(
        &queue,
        &[
            &[0xFE, 0, 0, 0, 0, 0xFF, 0x00, 0x00], // sets sticky color to red
            &[0xFE, 1, 0, 1, 0],                   // implicit-color variant
        ],
    );

    let mut buffer = PixelBuffer::new();
    let mut fonts = FontSet::new();
    let mut decoder = CommandDecoder::new();
    while let Some(packet) = queue.pop() {
        draw(&mut buffer, &mut fonts, &mut decoder, &packet);
    }

    assert_eq!(buffer.pixels()[1 * WIDTH + 1], 0xFFFF_0000);
}

#[test]
fn queue_capacity_bounds_a_burst_of_malformed_and_valid_packets() {
    let queue = PacketQueue::new(4);
    deliver(
        &queue,
        &[
            &[0xFE, 0, 0, 0, 0],
            &[0xFE, 0, 0, 1, 0],
            &[0xFE, 0, 0, 2, 0],
            &[0xFE, 0, 0, 3, 0], // dropped: one slot is always held back
            &[0xFE, 0, 0, 4, 0], // dropped: queue already at capacity - 1
        ],
    );
    assert_eq!(queue.size(), 3);
}
