//! Minimal 5x7 bitmap font for numeric labels.

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;
pub const ADVANCE: usize = GLYPH_WIDTH + 1;

fn glyph(c: char) -> Option<[u8; GLYPH_HEIGHT]> {
    let rows = match c {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        _ => return None,
    };
    Some(rows)
}

/// Calls `plot(x, y)` for every lit pixel of `text`, with the bottom glyph row
/// just above `baseline`. Unknown characters advance without drawing.
pub fn draw_text(text: &str, x: usize, baseline: usize, mut plot: impl FnMut(usize, usize)) {
    let top = baseline.saturating_sub(GLYPH_HEIGHT);
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let left = x + i * ADVANCE;
        for (dy, bits) in rows.iter().enumerate() {
            for dx in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - dx)) != 0 {
                    plot(left + dx, top + dy);
                }
            }
        }
    }
}
