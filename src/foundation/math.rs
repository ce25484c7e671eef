pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Undo alpha premultiplication of one channel, rounding to nearest.
///
/// Zero alpha maps every channel to 0; results saturate at 255 so slightly
/// malformed premultiplied input (`c > a`) stays in range.
pub(crate) fn unpremultiply(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let a = u32::from(a);
    let v = (u32::from(c) * 255 + a / 2) / a;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
