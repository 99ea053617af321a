//! Options for each generator, partial updates, tuned presets and TOML loading.
//!
//! `Default` on an options struct gives the generator's stock values;
//! `electric()` gives the tuned preset the coordinator uses. Patches carry
//! every field as optional and are validated as a whole before they commit.
//! Layer settings (`blur`, `z_index`) are fixed once a generator is created
//! and are not patchable.

use std::path::Path;

use serde::{Deserialize, Serialize};
use voltframe_platform::Color;

use crate::error::{EffectsError, Result};

/// Tint used when a direction profile leaves `color` unset.
pub const DEFAULT_PARTICLE_TINT: Color = Color(0x4dd9ff);

macro_rules! merge_fields {
    ($target:ident, $patch:ident; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )+
    };
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EffectsError::invalid(field, "must be finite"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(EffectsError::invalid(field, format!("{value} is negative")));
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(EffectsError::invalid(field, format!("{value} must be > 0")));
    }
    Ok(())
}

fn unit_interval(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(EffectsError::invalid(field, format!("{value} is outside [0, 1]")));
    }
    Ok(())
}

fn ordered(max_field: &'static str, min: f32, max: f32) -> Result<()> {
    if min > max {
        return Err(EffectsError::invalid(
            max_field,
            format!("{max} is below the paired minimum {min}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineOptions {
    /// Distance of the outline outside the frame, px.
    pub margin: f32,
    pub segments_per_edge: u32,
    /// Maximum displacement along the edge normal, px.
    pub amplitude: f32,
    pub speed: f32,
    pub color_core: Color,
    pub color_glow: Color,
    pub line_width_core: f32,
    pub line_width_glow: f32,
    pub blur: f32,
    pub flicker_alpha_min: f32,
    pub flicker_alpha_max: f32,
    pub close_loop: bool,
    pub z_index: Option<i32>,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            margin: 24.0,
            segments_per_edge: 48,
            amplitude: 16.0,
            speed: 2.0,
            color_core: Color::WHITE,
            color_glow: Color(0x33ccff),
            line_width_core: 2.0,
            line_width_glow: 10.0,
            blur: 10.0,
            flicker_alpha_min: 0.6,
            flicker_alpha_max: 1.0,
            close_loop: true,
            z_index: None,
        }
    }
}

impl OutlineOptions {
    pub fn electric() -> Self {
        Self {
            margin: 10.0,
            segments_per_edge: 90,
            amplitude: 12.0,
            speed: 4.2,
            color_glow: Color(0x4dd9ff),
            line_width_glow: 20.0,
            line_width_core: 1.0,
            blur: 10.0,
            z_index: Some(15),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("margin", self.margin)?;
        if self.segments_per_edge == 0 {
            return Err(EffectsError::invalid("segments_per_edge", "must be at least 1"));
        }
        non_negative("amplitude", self.amplitude)?;
        finite("speed", self.speed)?;
        non_negative("line_width_core", self.line_width_core)?;
        non_negative("line_width_glow", self.line_width_glow)?;
        non_negative("blur", self.blur)?;
        unit_interval("flicker_alpha_min", self.flicker_alpha_min)?;
        unit_interval("flicker_alpha_max", self.flicker_alpha_max)?;
        ordered("flicker_alpha_max", self.flicker_alpha_min, self.flicker_alpha_max)
    }

    /// Copy with `patch` merged in, or the first field that fails validation.
    pub fn patched(&self, patch: &OutlinePatch) -> Result<Self> {
        let mut next = self.clone();
        merge_fields!(next, patch;
            margin, segments_per_edge, amplitude, speed, color_core, color_glow,
            line_width_core, line_width_glow, flicker_alpha_min, flicker_alpha_max,
            close_loop,
        );
        next.validate()?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlinePatch {
    pub margin: Option<f32>,
    pub segments_per_edge: Option<u32>,
    pub amplitude: Option<f32>,
    pub speed: Option<f32>,
    pub color_core: Option<Color>,
    pub color_glow: Option<Color>,
    pub line_width_core: Option<f32>,
    pub line_width_glow: Option<f32>,
    pub flicker_alpha_min: Option<f32>,
    pub flicker_alpha_max: Option<f32>,
    pub close_loop: Option<bool>,
}

impl OutlinePatch {
    /// Whether applying this patch changes the perimeter point layout.
    pub fn touches_layout(&self) -> bool {
        self.segments_per_edge.is_some() || self.margin.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltOptions {
    pub margin: f32,
    pub max_bolts: usize,
    /// Per-tick spawn probability.
    pub spawn_chance: f32,
    /// Milliseconds.
    pub min_life: f32,
    pub max_life: f32,
    pub segments: u32,
    pub amplitude: f32,
    /// Full width of the lateral endpoint jitter, px.
    pub end_jitter: f32,
    pub color_core: Color,
    pub color_glow: Color,
    pub line_width_core: f32,
    pub line_width_glow: f32,
    pub blur: f32,
    pub flicker_alpha_min: f32,
    pub flicker_alpha_max: f32,
    pub z_index: Option<i32>,
}

impl Default for BoltOptions {
    fn default() -> Self {
        Self {
            margin: 24.0,
            max_bolts: 8,
            spawn_chance: 0.25,
            min_life: 60.0,
            max_life: 160.0,
            segments: 18,
            amplitude: 18.0,
            end_jitter: 30.0,
            color_core: Color::WHITE,
            color_glow: Color(0x33ccff),
            line_width_core: 2.0,
            line_width_glow: 8.0,
            blur: 8.0,
            flicker_alpha_min: 0.5,
            flicker_alpha_max: 1.0,
            z_index: None,
        }
    }
}

impl BoltOptions {
    pub fn electric() -> Self {
        Self {
            margin: 15.0,
            max_bolts: 7,
            spawn_chance: 0.3,
            min_life: 50.0,
            max_life: 140.0,
            amplitude: 22.0,
            segments: 7,
            color_glow: Color(0x4dd9ff),
            line_width_glow: 10.0,
            line_width_core: 2.0,
            blur: 10.0,
            z_index: Some(20),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("margin", self.margin)?;
        unit_interval("spawn_chance", self.spawn_chance)?;
        positive("min_life", self.min_life)?;
        positive("max_life", self.max_life)?;
        ordered("max_life", self.min_life, self.max_life)?;
        if self.segments == 0 {
            return Err(EffectsError::invalid("segments", "must be at least 1"));
        }
        non_negative("amplitude", self.amplitude)?;
        non_negative("end_jitter", self.end_jitter)?;
        non_negative("line_width_core", self.line_width_core)?;
        non_negative("line_width_glow", self.line_width_glow)?;
        non_negative("blur", self.blur)?;
        unit_interval("flicker_alpha_min", self.flicker_alpha_min)?;
        unit_interval("flicker_alpha_max", self.flicker_alpha_max)?;
        ordered("flicker_alpha_max", self.flicker_alpha_min, self.flicker_alpha_max)
    }

    pub fn patched(&self, patch: &BoltPatch) -> Result<Self> {
        let mut next = self.clone();
        merge_fields!(next, patch;
            margin, max_bolts, spawn_chance, min_life, max_life, segments, amplitude,
            end_jitter, color_core, color_glow, line_width_core, line_width_glow,
            flicker_alpha_min, flicker_alpha_max,
        );
        next.validate()?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoltPatch {
    pub margin: Option<f32>,
    pub max_bolts: Option<usize>,
    pub spawn_chance: Option<f32>,
    pub min_life: Option<f32>,
    pub max_life: Option<f32>,
    pub segments: Option<u32>,
    pub amplitude: Option<f32>,
    pub end_jitter: Option<f32>,
    pub color_core: Option<Color>,
    pub color_glow: Option<Color>,
    pub line_width_core: Option<f32>,
    pub line_width_glow: Option<f32>,
    pub flicker_alpha_min: Option<f32>,
    pub flicker_alpha_max: Option<f32>,
}

/// Multipliers and biases distinguishing inward from outward particles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionProfile {
    pub speed_mul: f32,
    pub life_mul: f32,
    pub size_mul: f32,
    pub color: Option<Color>,
    /// Per-frame velocity retention; falls back to the base `drag`.
    pub drag: Option<f32>,
    pub alpha_bias: f32,
    pub alpha_mul: f32,
    pub fade_dist_mul: f32,
}

impl DirectionProfile {
    pub fn inward() -> Self {
        Self {
            speed_mul: 0.85,
            life_mul: 1.2,
            size_mul: 0.95,
            color: Some(Color(0x66eeff)),
            drag: Some(0.93),
            alpha_bias: 0.10,
            alpha_mul: 1.0,
            fade_dist_mul: 0.8,
        }
    }

    pub fn outward() -> Self {
        Self {
            speed_mul: 1.1,
            life_mul: 0.9,
            size_mul: 1.0,
            color: Some(Color(0x33ccff)),
            drag: Some(0.88),
            alpha_bias: 0.05,
            alpha_mul: 0.9,
            fade_dist_mul: 1.0,
        }
    }

    fn validate(&self, prefix: &'static str) -> Result<()> {
        let check = |result: Result<()>| {
            result.map_err(|err| match err {
                EffectsError::InvalidOption { field, reason } => {
                    EffectsError::invalid(prefix, format!("{field}: {reason}"))
                }
                other => other,
            })
        };
        check(non_negative("speed_mul", self.speed_mul))?;
        check(positive("life_mul", self.life_mul))?;
        check(non_negative("size_mul", self.size_mul))?;
        if let Some(drag) = self.drag {
            check(unit_interval("drag", drag))?;
        }
        check(finite("alpha_bias", self.alpha_bias))?;
        check(finite("alpha_mul", self.alpha_mul))?;
        check(non_negative("fade_dist_mul", self.fade_dist_mul))
    }

    fn patched(&self, patch: &DirectionProfilePatch) -> Self {
        let mut next = *self;
        merge_fields!(next, patch;
            speed_mul, life_mul, size_mul, alpha_bias, alpha_mul, fade_dist_mul,
        );
        if let Some(color) = patch.color {
            next.color = Some(color);
        }
        if let Some(drag) = patch.drag {
            next.drag = Some(drag);
        }
        next
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectionProfilePatch {
    pub speed_mul: Option<f32>,
    pub life_mul: Option<f32>,
    pub size_mul: Option<f32>,
    pub color: Option<Color>,
    pub drag: Option<f32>,
    pub alpha_bias: Option<f32>,
    pub alpha_mul: Option<f32>,
    pub fade_dist_mul: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleOptions {
    /// Particles per second.
    pub spawn_rate: f32,
    pub max_particles: usize,
    /// Seconds.
    pub min_life: f32,
    pub max_life: f32,
    /// px/s.
    pub min_speed: f32,
    pub max_speed: f32,
    /// Sprite diameter range, px.
    pub size_min: f32,
    pub size_max: f32,
    pub blur: f32,
    pub inward_chance: f32,
    /// px/s added along the edge tangent, drawn from `[-j, j]`.
    pub tangential_jitter: f32,
    /// px from the frame perimeter over which particles fade out.
    pub fade_distance: f32,
    pub drag: f32,
    pub inward: DirectionProfile,
    pub outward: DirectionProfile,
    pub z_index: Option<i32>,
}

impl Default for ParticleOptions {
    fn default() -> Self {
        Self {
            spawn_rate: 140.0,
            max_particles: 220,
            min_life: 0.6,
            max_life: 1.4,
            min_speed: 120.0,
            max_speed: 260.0,
            size_min: 2.0,
            size_max: 6.0,
            blur: 3.0,
            inward_chance: 0.5,
            tangential_jitter: 60.0,
            fade_distance: 220.0,
            drag: 0.92,
            inward: DirectionProfile::inward(),
            outward: DirectionProfile::outward(),
            z_index: Some(18),
        }
    }
}

impl ParticleOptions {
    pub fn electric() -> Self {
        Self {
            spawn_rate: 140.0,
            max_particles: 240,
            min_life: 0.6,
            max_life: 1.6,
            min_speed: 140.0,
            max_speed: 260.0,
            size_min: 2.0,
            size_max: 5.0,
            inward_chance: 0.55,
            tangential_jitter: 80.0,
            fade_distance: 260.0,
            inward: DirectionProfile {
                life_mul: 1.25,
                ..DirectionProfile::inward()
            },
            outward: DirectionProfile {
                speed_mul: 1.35,
                life_mul: 1.2,
                size_mul: 1.05,
                color: Some(Color(0x33ccff)),
                drag: Some(0.97),
                alpha_bias: 0.12,
                alpha_mul: 1.1,
                fade_dist_mul: 2.5,
            },
            z_index: Some(18),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("spawn_rate", self.spawn_rate)?;
        positive("min_life", self.min_life)?;
        positive("max_life", self.max_life)?;
        ordered("max_life", self.min_life, self.max_life)?;
        non_negative("min_speed", self.min_speed)?;
        non_negative("max_speed", self.max_speed)?;
        ordered("max_speed", self.min_speed, self.max_speed)?;
        non_negative("size_min", self.size_min)?;
        non_negative("size_max", self.size_max)?;
        ordered("size_max", self.size_min, self.size_max)?;
        non_negative("blur", self.blur)?;
        unit_interval("inward_chance", self.inward_chance)?;
        non_negative("tangential_jitter", self.tangential_jitter)?;
        non_negative("fade_distance", self.fade_distance)?;
        unit_interval("drag", self.drag)?;
        self.inward.validate("inward")?;
        self.outward.validate("outward")
    }

    pub fn patched(&self, patch: &ParticlePatch) -> Result<Self> {
        let mut next = self.clone();
        merge_fields!(next, patch;
            spawn_rate, max_particles, min_life, max_life, min_speed, max_speed,
            size_min, size_max, inward_chance, tangential_jitter, fade_distance, drag,
        );
        if let Some(inward) = &patch.inward {
            next.inward = next.inward.patched(inward);
        }
        if let Some(outward) = &patch.outward {
            next.outward = next.outward.patched(outward);
        }
        next.validate()?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticlePatch {
    pub spawn_rate: Option<f32>,
    pub max_particles: Option<usize>,
    pub min_life: Option<f32>,
    pub max_life: Option<f32>,
    pub min_speed: Option<f32>,
    pub max_speed: Option<f32>,
    pub size_min: Option<f32>,
    pub size_max: Option<f32>,
    pub inward_chance: Option<f32>,
    pub tangential_jitter: Option<f32>,
    pub fade_distance: Option<f32>,
    pub drag: Option<f32>,
    pub inward: Option<DirectionProfilePatch>,
    pub outward: Option<DirectionProfilePatch>,
}

/// Timing and overlay copy of the celebration sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceConfig {
    /// How long outline and bolts run before retiring, ms.
    pub spark_duration_ms: f64,
    /// Delay between sparks retiring and the overlay appearing, ms.
    pub overlay_delay_ms: f64,
    /// Backdrop alpha while the effects run.
    pub dim_alpha: f32,
    pub restore_alpha: f32,
    pub fade_ms: f64,
    /// Overlay size relative to the frame.
    pub overlay_scale: f32,
    pub title: String,
    pub subtitle: String,
    pub hint: String,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            spark_duration_ms: 2000.0,
            overlay_delay_ms: 0.0,
            dim_alpha: 0.15,
            restore_alpha: 1.0,
            fade_ms: 700.0,
            overlay_scale: 0.9,
            title: "Congratulations".into(),
            subtitle: "You have won 8 Bonus Spins".into(),
            hint: "Press anywhere to continue".into(),
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.spark_duration_ms.is_finite() && self.spark_duration_ms >= 0.0) {
            return Err(EffectsError::invalid("spark_duration_ms", "must be >= 0"));
        }
        if !(self.overlay_delay_ms.is_finite() && self.overlay_delay_ms >= 0.0) {
            return Err(EffectsError::invalid("overlay_delay_ms", "must be >= 0"));
        }
        if !(self.fade_ms.is_finite() && self.fade_ms >= 0.0) {
            return Err(EffectsError::invalid("fade_ms", "must be >= 0"));
        }
        unit_interval("dim_alpha", self.dim_alpha)?;
        unit_interval("restore_alpha", self.restore_alpha)?;
        positive("overlay_scale", self.overlay_scale)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    outline: OutlinePatch,
    bolts: BoltPatch,
    particles: ParticlePatch,
    sequence: Option<SequenceConfig>,
}

/// Full effect configuration. `Default` is the tuned electric preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectsConfig {
    pub outline: OutlineOptions,
    pub bolts: BoltOptions,
    pub particles: ParticleOptions,
    pub sequence: SequenceConfig,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            outline: OutlineOptions::electric(),
            bolts: BoltOptions::electric(),
            particles: ParticleOptions::electric(),
            sequence: SequenceConfig::default(),
        }
    }
}

impl EffectsConfig {
    /// Parses TOML overrides and applies them on top of the tuned preset.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source)?;
        let base = Self::default();
        let config = Self {
            outline: base.outline.patched(&file.outline)?,
            bolts: base.bolts.patched(&file.bolts)?,
            particles: base.particles.patched(&file.particles)?,
            sequence: file.sequence.unwrap_or(base.sequence),
        };
        config.sequence.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| EffectsError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        self.outline.validate()?;
        self.bolts.validate()?;
        self.particles.validate()?;
        self.sequence.validate()
    }
}
