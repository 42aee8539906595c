//! Apple Video (`rpza`), 4x4 block vector quantization
//! over 15-bit (5-5-5) colors.

use log::{trace, warn};

use crate::{support::ByteStream, QtError};

use super::{CodecParams, DecodedPlane, PlaneLayout};

/// Chunk marker preceding the 24-bit chunk length.
const CHUNK_MARKER: u8 = 0xE1;
const BLOCK: usize = 4;

/// Opcode dispatch state. A byte with the high bit clear starts
/// a directly specified color. Whether that color opens a
/// palette block or a 16 color block depends on the byte after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingOpcode,
    DirectColorPending(u16),
}

/// Block grid with 15-bit colors, clipped to the frame size.
struct Blocks {
    width: usize,
    height: usize,
    per_row: usize,
    total: usize,
    colors: Vec<u16>,
}

impl Blocks {
    fn new(width: usize, height: usize) -> Self {
        let per_row = width.div_ceil(BLOCK);
        Self {
            width,
            height,
            per_row,
            total: per_row * height.div_ceil(BLOCK),
            colors: vec![0; width * height],
        }
    }

    /// Sets pixel `(x, y)` inside `block`.
    fn set(&mut self, block: usize, x: usize, y: usize, color: u16) {
        let px = (block % self.per_row) * BLOCK + x;
        let py = (block / self.per_row) * BLOCK + y;
        if px < self.width && py < self.height {
            self.colors[py * self.width + px] = color;
        }
    }

    fn fill(&mut self, block: usize, color: u16) {
        for y in 0 .. BLOCK {
            for x in 0 .. BLOCK {
                self.set(block, x, y, color);
            }
        }
    }

    /// Unpacks colors into three 8-bit channel planes (R, G, B).
    /// Channels are taken from the inverted color.
    fn into_planes(self) -> Vec<u8> {
        let n = self.colors.len();
        let mut out = vec![0_u8; n * 3];
        for (i, color) in self.colors.iter().enumerate() {
            let v = 0xFFFF - color;
            out[i] = widen((v >> 10) & 0x1F);
            out[n + i] = widen((v >> 5) & 0x1F);
            out[2 * n + i] = widen(v & 0x1F);
        }
        out
    }
}

/// 5-bit channel to 8 bits via bit replication.
pub(crate) fn widen(value: u16) -> u8 {
    ((value << 3) | (value >> 2)) as u8
}

/// Four color palette between `a` and `b`, blended per 5-bit channel.
pub(crate) fn palette(a: u16, b: u16) -> [u16; 4] {
    let mut colors = [b, 0, 0, a];
    for shift in [10, 5, 0] {
        let ta = (a >> shift) & 0x1F;
        let tb = (b >> shift) & 0x1F;
        colors[1] |= ((11 * ta + 21 * tb) >> 5) << shift;
        colors[2] |= ((21 * ta + 11 * tb) >> 5) << shift;
    }
    colors
}

pub(crate) fn decode(sample: &[u8], params: &CodecParams) -> Result<DecodedPlane, QtError> {
    let start = sample.iter()
        .position(|b| *b == CHUNK_MARKER)
        .ok_or_else(|| QtError::Corrupt("no rpza chunk marker".to_owned()))?;

    let mut header = ByteStream::new(&sample[start + 1 ..]);
    let chunk_len = header.u24()? as usize;
    let end = match chunk_len >= 4 && start + chunk_len <= sample.len() {
        true => start + chunk_len,
        false => {
            warn!("rpza: chunk length {chunk_len} does not match sample size {}", sample.len() - start);
            sample.len()
        }
    };

    let mut stream = ByteStream::new(&sample[start + 4 .. end]);
    let mut blocks = Blocks::new(params.width, params.height);

    let mut block = 0;
    let mut state = State::AwaitingOpcode;
    let mut color_a: u16 = 0;
    let mut color_b: u16;

    while block < blocks.total {
        match state {
            State::AwaitingOpcode => {
                if stream.remaining() == 0 {
                    break
                }
                let op = stream.u8()?;
                if op & 0x80 == 0 {
                    state = State::DirectColorPending(((op as u16) << 8) | stream.u8()? as u16);
                    continue
                }

                let n = ((op & 0x1F) as usize) + 1;
                match op & 0xE0 {
                    0x80 => block += n,
                    0xA0 => {
                        color_a = stream.u16()?;
                        for _ in 0 .. n {
                            blocks.fill(block, color_a);
                            block += 1;
                        }
                    },
                    op_class @ (0xC0 | 0x20) => {
                        if op_class == 0xC0 {
                            color_a = stream.u16()?;
                        }
                        color_b = stream.u16()?;
                        let colors = palette(color_a, color_b);
                        for _ in 0 .. n {
                            palette_block(&mut stream, &mut blocks, block, &colors)?;
                            block += 1;
                        }
                    },
                    other => trace!("rpza: ignoring opcode 0x{other:02x}"),
                }
            },
            State::DirectColorPending(color) => {
                color_a = color;
                state = State::AwaitingOpcode;
                match stream.peek_u8() {
                    Some(next) if next & 0x80 != 0 => {
                        // Single palette block
                        color_b = stream.u16()?;
                        palette_block(&mut stream, &mut blocks, block, &palette(color_a, color_b))?;
                    },
                    _ => {
                        // 16 colors, first one already read
                        for i in 0 .. BLOCK * BLOCK {
                            let c = match i {
                                0 => color_a,
                                _ => stream.u16()?,
                            };
                            blocks.set(block, i % BLOCK, i / BLOCK, c);
                        }
                    }
                }
                block += 1;
            },
        }
    }

    Ok(DecodedPlane::new(
        params.width,
        params.height,
        3,
        PlaneLayout::Planar,
        blocks.into_planes()
    ))
}

/// Reads four index bytes, one per block row, two bits per pixel.
fn palette_block(
    stream: &mut ByteStream,
    blocks: &mut Blocks,
    block: usize,
    colors: &[u16; 4]
) -> Result<(), QtError> {
    for y in 0 .. BLOCK {
        let index = stream.u8()?;
        for x in 0 .. BLOCK {
            let idx = (index >> (2 * (3 - x))) & 0x03;
            blocks.set(block, x, y, colors[idx as usize]);
        }
    }
    Ok(())
}
