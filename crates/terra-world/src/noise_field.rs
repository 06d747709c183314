//! Multi-octave height-field synthesis.
//!
//! Heights are fractal Perlin noise: a stack of octaves, each sampled from an
//! independent region of the noise domain, summed with decaying amplitude and
//! growing frequency, then normalized so the lowest cell of the field is 0 and
//! the highest is 1.

use glam::{DVec2, Vec2};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use terra_common::SchemaVersion;

/// Smallest accepted noise scale.
pub const MIN_SCALE: f32 = 0.0001;

/// Octave offsets are drawn from `[-OCTAVE_OFFSET_RANGE, OCTAVE_OFFSET_RANGE)`.
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Value every cell takes when the raw field is perfectly flat.
pub const CONSTANT_FIELD_VALUE: f32 = 0.5;

/// Permutation seed of the gradient noise primitive. Changing it changes
/// every generated field; bump [`SchemaVersion::GRADIENT_NOISE`] with it.
const PERLIN_PERMUTATION_SEED: u32 = 0;

/// The 2D gradient-noise primitive, remapped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct GradientNoise {
    perlin: Perlin,
}

impl Default for GradientNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientNoise {
    /// Version of the primitive. Golden data records it.
    pub const VERSION: SchemaVersion = SchemaVersion::GRADIENT_NOISE;

    /// Creates the primitive with its fixed permutation table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            perlin: Perlin::new(PERLIN_PERMUTATION_SEED),
        }
    }

    /// Samples the noise at `point`, in `[0, 1]`.
    #[must_use]
    pub fn sample01(&self, point: DVec2) -> f32 {
        let raw = self.perlin.get([point.x, point.y]);
        (raw * 0.5 + 0.5).clamp(0.0, 1.0) as f32
    }
}

/// Parameters of a height-field synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// PRNG seed for the octave offsets
    pub seed: i32,
    /// Zoom of the noise domain (larger = smoother)
    pub scale: f32,
    /// Number of octaves
    pub octaves: u32,
    /// Amplitude multiplier per octave
    pub persistence: f32,
    /// Frequency multiplier per octave (>= 1)
    pub lacunarity: f32,
    /// Global offset added to every octave offset
    pub offset: Vec2,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseParams {
    /// Applies the domain clamps: `scale >= MIN_SCALE`, `lacunarity >= 1`.
    /// The octave count is unsigned so it needs no floor.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.scale = if self.scale.is_nan() {
            MIN_SCALE
        } else {
            self.scale.max(MIN_SCALE)
        };
        self.lacunarity = if self.lacunarity.is_nan() {
            1.0
        } else {
            self.lacunarity.max(1.0)
        };
        self
    }
}

/// Dense row-major grid of normalized heights.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl HeightField {
    /// Wraps existing values. Returns `None` if the length does not match.
    #[must_use]
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Option<Self> {
        (values.len() == width * height).then_some(Self {
            width,
            height,
            values,
        })
    }

    /// Creates a field where every cell has the same value.
    #[must_use]
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Height at column `x`, row `y`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get(y * self.width + x).copied()
    }

    /// All values, row-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns rows as vectors (used for golden snapshots).
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<f32>> {
        if self.width == 0 {
            return Vec::new();
        }
        self.values.chunks(self.width).map(<[f32]>::to_vec).collect()
    }
}

/// Derives one offset per octave so octaves sample independent regions.
#[must_use]
pub fn octave_offsets(seed: i32, octaves: u32, offset: Vec2) -> Vec<DVec2> {
    let mut rng = fastrand::Rng::with_seed(seed as u64);
    let offset = offset.as_dvec2();
    (0..octaves)
        .map(|_| {
            let x = rng.i32(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
            let y = rng.i32(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
            DVec2::new(f64::from(x), f64::from(y)) + offset
        })
        .collect()
}

/// Maps `value` from `[min, max]` onto `[0, 1]`.
fn inverse_lerp(min: f32, max: f32, value: f32) -> f32 {
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return CONSTANT_FIELD_VALUE;
    }
    ((value - min) / range).clamp(0.0, 1.0)
}

/// Generates a `width` x `height` normalized height field.
///
/// Deterministic: the same parameters and primitive always produce the same
/// bits. Parameters are clamped before use.
#[must_use]
pub fn generate(
    width: usize,
    height: usize,
    params: &NoiseParams,
    noise: &GradientNoise,
) -> HeightField {
    let params = params.clamped();
    let offsets = octave_offsets(params.seed, params.octaves, params.offset);

    let scale = f64::from(params.scale);
    let lacunarity = f64::from(params.lacunarity);
    let half_width = width as f64 / 2.0;
    let half_height = height as f64 / 2.0;

    let mut values = Vec::with_capacity(width * height);
    let mut min_height = f32::MAX;
    let mut max_height = f32::MIN;

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0_f32;
            let mut frequency = 1.0_f64;
            let mut noise_height = 0.0_f32;

            for octave in &offsets {
                let sample = DVec2::new(
                    ((x as f64 - half_width) / scale + octave.x) * frequency,
                    ((y as f64 - half_height) / scale + octave.y) * frequency,
                );
                let value = noise.sample01(sample) * 2.0 - 1.0;
                noise_height += value * amplitude;

                amplitude *= params.persistence;
                frequency *= lacunarity;
            }

            min_height = min_height.min(noise_height);
            max_height = max_height.max(noise_height);
            values.push(noise_height);
        }
    }

    for value in &mut values {
        *value = inverse_lerp(min_height, max_height, *value);
    }

    HeightField {
        width,
        height,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: i32) -> NoiseParams {
        NoiseParams {
            seed,
            scale: 27.6,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::new(13.0, -7.5),
        }
    }

    #[test]
    fn test_generation_deterministic() {
        let noise = GradientNoise::new();
        let a = generate(33, 33, &params(42), &noise);
        let b = generate(33, 33, &params(42), &GradientNoise::new());

        let bits_a: Vec<u32> = a.values().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_different_seeds_different_terrain() {
        let noise = GradientNoise::new();
        let a = generate(33, 33, &params(42), &noise);
        let b = generate(33, 33, &params(999), &noise);
        assert_ne!(a.values(), b.values());
    }

    #[test]
    fn test_normalized_bounds() {
        let noise = GradientNoise::new();
        let field = generate(41, 41, &params(7), &noise);

        assert!(field.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(field.values().iter().any(|&v| v == 0.0));
        assert!(field.values().iter().any(|&v| v == 1.0));
    }

    #[test]
    fn test_zero_octaves_is_constant_fallback() {
        let noise = GradientNoise::new();
        let mut p = params(1);
        p.octaves = 0;
        let field = generate(9, 9, &p, &noise);
        assert!(field.values().iter().all(|&v| v == CONSTANT_FIELD_VALUE));
    }

    #[test]
    fn test_octave_offsets_in_range() {
        let offsets = octave_offsets(42, 16, Vec2::ZERO);
        assert_eq!(offsets.len(), 16);
        let range = f64::from(OCTAVE_OFFSET_RANGE);
        for o in &offsets {
            assert!(o.x >= -range && o.x < range);
            assert!(o.y >= -range && o.y < range);
        }
        assert_eq!(offsets, octave_offsets(42, 16, Vec2::ZERO));
    }

    #[test]
    fn test_octave_offsets_include_global_offset() {
        let base = octave_offsets(3, 2, Vec2::ZERO);
        let shifted = octave_offsets(3, 2, Vec2::new(10.0, -4.0));
        for (b, s) in base.iter().zip(&shifted) {
            assert_eq!(*s - *b, DVec2::new(10.0, -4.0));
        }
    }

    #[test]
    fn test_clamps() {
        let p = NoiseParams {
            scale: -3.0,
            lacunarity: 0.25,
            ..NoiseParams::default()
        }
        .clamped();
        assert_eq!(p.scale, MIN_SCALE);
        assert_eq!(p.lacunarity, 1.0);

        let p = NoiseParams {
            scale: f32::NAN,
            ..NoiseParams::default()
        }
        .clamped();
        assert_eq!(p.scale, MIN_SCALE);
    }

    #[test]
    fn test_zero_scale_does_not_produce_nan() {
        let noise = GradientNoise::new();
        let mut p = params(5);
        p.scale = 0.0;
        let field = generate(9, 9, &p, &noise);
        assert!(field.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sample01_range() {
        let noise = GradientNoise::new();
        for i in 0..200 {
            let t = f64::from(i) * 0.37;
            let v = noise.sample01(DVec2::new(t, -t * 1.3));
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_height_field_accessors() {
        let field = HeightField::from_values(3, 2, vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5])
            .expect("length matches");
        assert_eq!(field.get(2, 1), Some(0.5));
        assert_eq!(field.get(3, 0), None);
        assert_eq!(field.rows().len(), 2);
        assert!(HeightField::from_values(3, 3, vec![0.0; 4]).is_none());
    }
}
