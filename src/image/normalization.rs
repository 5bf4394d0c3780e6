/// Smallest and largest value, `None` for an empty input
#[inline]
#[must_use]
pub fn find_min_max(values: impl IntoIterator<Item = u8>) -> Option<(u8, u8)> {
    values.into_iter().fold(None, |acc, val| match acc {
        None => Some((val, val)),
        Some((min, max)) => Some((min.min(val), max.max(val))),
    })
}

/// Linearly map `[min, max]` onto `[0, 255]`
#[inline]
#[must_use]
pub fn stretch_u8(value: u8, min: u8, max: u8) -> u8 {
    if max <= min {
        return value;
    }
    let scale = 255.0_f32 / f32::from(max - min);
    (f32::from(value.saturating_sub(min)) * scale).round().min(255.0) as u8
}
