use rand::Rng;

/// Uniform in `[min, max)`; returns `min` when the range is empty.
pub(crate) fn between(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    min + rng.gen::<f32>() * (max - min)
}

/// Uniform in `[-1, 1)`.
pub(crate) fn signed_unit(rng: &mut impl Rng) -> f32 {
    rng.gen::<f32>() * 2.0 - 1.0
}
