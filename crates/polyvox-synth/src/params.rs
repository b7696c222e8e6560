//! The synthesizer parameter table and its lock-free store.
//!
//! Every parameter is a variant of [`ParamId`] and has a static
//! [`ParamDescriptor`] giving its name, kind, range and default. Values cross
//! from the control thread to the render thread through [`ParamStore`], one
//! `AtomicU32` per parameter holding the bit pattern of an `f32`. Waveform
//! parameters store the variant index.
//!
//! ```rust
//! use polyvox_synth::{ParamId, ParamStore};
//!
//! let store = ParamStore::new();
//! assert_eq!(store.set(ParamId::FilterCutoff, 999_999.0), 20_000.0);
//! assert_eq!(store.get(ParamId::FilterCutoff), 20_000.0);
//! ```

use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use polyvox_core::Waveform;
use serde::{Deserialize, Serialize};

use crate::error::SynthError;
use crate::voice::VoiceParams;

/// How a parameter's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Continuous value.
    Number,
    /// Value rounded to the nearest integer on store.
    Integer,
    /// A [`Waveform`] selector, stored as its index.
    Waveform,
}

impl ParamKind {
    /// Short lowercase label used in listings.
    pub const fn label(self) -> &'static str {
        match self {
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Waveform => "waveform",
        }
    }
}

/// Static metadata for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Which parameter this describes.
    pub id: ParamId,
    /// Stable snake_case name used at the control boundary.
    pub name: &'static str,
    /// Value interpretation.
    pub kind: ParamKind,
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
    /// Value at construction and after reset.
    pub default: f32,
    /// Display unit, empty when unitless.
    pub unit: &'static str,
    /// One-line description.
    pub description: &'static str,
}

impl ParamDescriptor {
    const fn number(
        id: ParamId,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
        unit: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Number,
            min,
            max,
            default,
            unit,
            description,
        }
    }

    const fn integer(
        id: ParamId,
        name: &'static str,
        min: f32,
        max: f32,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Integer,
            min,
            max,
            default: 0.0,
            unit: "oct",
            description,
        }
    }

    const fn waveform(
        id: ParamId,
        name: &'static str,
        default: Waveform,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Waveform,
            min: 0.0,
            max: (Waveform::ALL.len() - 1) as f32,
            default: default.index() as f32,
            unit: "",
            description,
        }
    }

    /// Clamp (and for integer kinds, round) a raw value into range.
    ///
    /// NaN maps to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let value = match self.kind {
            ParamKind::Number => value,
            ParamKind::Integer | ParamKind::Waveform => value.round(),
        };
        value.clamp(self.min, self.max)
    }

    /// Convert a stored raw value to the public [`ParamValue`] form.
    pub fn to_value(&self, raw: f32) -> ParamValue {
        match self.kind {
            ParamKind::Waveform => ParamValue::Waveform(waveform_from_raw(raw)),
            ParamKind::Number | ParamKind::Integer => ParamValue::Number(raw),
        }
    }

    /// Convert a [`ParamValue`] to the raw stored form, checking its kind.
    pub fn to_raw(&self, value: ParamValue) -> Result<f32, SynthError> {
        match (self.kind, value) {
            (ParamKind::Waveform, ParamValue::Waveform(w)) => Ok(w.index() as f32),
            (ParamKind::Waveform, ParamValue::Number(_)) => Err(SynthError::InvalidValue {
                param: self.name.to_string(),
                reason: "expected a waveform name".to_string(),
            }),
            (_, ParamValue::Waveform(_)) => Err(SynthError::InvalidValue {
                param: self.name.to_string(),
                reason: "expected a number".to_string(),
            }),
            (_, ParamValue::Number(n)) if !n.is_finite() => Err(SynthError::InvalidValue {
                param: self.name.to_string(),
                reason: format!("{n} is not a finite number"),
            }),
            (_, ParamValue::Number(n)) => Ok(self.clamp(n)),
        }
    }

    /// Parse a textual value for this parameter.
    ///
    /// Waveform parameters take a waveform name; the rest take a number.
    pub fn parse(&self, text: &str) -> Result<ParamValue, SynthError> {
        match self.kind {
            ParamKind::Waveform => text
                .parse::<Waveform>()
                .map(ParamValue::Waveform)
                .map_err(|_| SynthError::InvalidWaveform(text.trim().to_string())),
            ParamKind::Number | ParamKind::Integer => text
                .trim()
                .parse::<f32>()
                .map(ParamValue::Number)
                .map_err(|e| SynthError::InvalidValue {
                    param: self.name.to_string(),
                    reason: format!("'{}': {e}", text.trim()),
                }),
        }
    }
}

/// Identifier for every synthesizer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum ParamId {
    Osc1Waveform,
    Osc1Level,
    Osc1Detune,
    Osc1Octave,
    Osc1PulseWidth,
    Osc2Waveform,
    Osc2Level,
    Osc2Detune,
    Osc2Octave,
    Osc2PulseWidth,
    FilterCutoff,
    FilterResonance,
    FilterEnvAmount,
    AmpAttack,
    AmpDecay,
    AmpSustain,
    AmpRelease,
    FilterAttack,
    FilterDecay,
    FilterSustain,
    FilterRelease,
    LfoWaveform,
    LfoRate,
    LfoDepth,
    LfoToPitch,
    LfoToFilter,
    LfoToPw,
    MasterVolume,
}

impl ParamId {
    /// Number of parameters.
    pub const COUNT: usize = 28;

    /// All parameters in table order.
    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::Osc1Waveform,
        ParamId::Osc1Level,
        ParamId::Osc1Detune,
        ParamId::Osc1Octave,
        ParamId::Osc1PulseWidth,
        ParamId::Osc2Waveform,
        ParamId::Osc2Level,
        ParamId::Osc2Detune,
        ParamId::Osc2Octave,
        ParamId::Osc2PulseWidth,
        ParamId::FilterCutoff,
        ParamId::FilterResonance,
        ParamId::FilterEnvAmount,
        ParamId::AmpAttack,
        ParamId::AmpDecay,
        ParamId::AmpSustain,
        ParamId::AmpRelease,
        ParamId::FilterAttack,
        ParamId::FilterDecay,
        ParamId::FilterSustain,
        ParamId::FilterRelease,
        ParamId::LfoWaveform,
        ParamId::LfoRate,
        ParamId::LfoDepth,
        ParamId::LfoToPitch,
        ParamId::LfoToFilter,
        ParamId::LfoToPw,
        ParamId::MasterVolume,
    ];

    /// Position in [`ParamId::ALL`] and in the store.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Static metadata.
    pub fn descriptor(self) -> &'static ParamDescriptor {
        &PARAMS[self.index()]
    }

    /// Control-boundary name.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Look a parameter up by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        PARAMS.iter().find(|d| d.name == name).map(|d| d.id)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamId {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| SynthError::UnknownParameter(s.to_string()))
    }
}

use ParamDescriptor as D;
use ParamId as P;

/// The parameter table, indexed by [`ParamId::index`].
#[rustfmt::skip]
pub static PARAMS: [ParamDescriptor; ParamId::COUNT] = [
    D::waveform(P::Osc1Waveform, "osc1_waveform", Waveform::Sawtooth, "Oscillator 1 shape"),
    D::number(P::Osc1Level, "osc1_level", 0.0, 1.0, 0.7, "", "Oscillator 1 mix level"),
    D::number(P::Osc1Detune, "osc1_detune", -100.0, 100.0, 0.0, "ct", "Oscillator 1 fine tune"),
    D::integer(P::Osc1Octave, "osc1_octave", -2.0, 2.0, "Oscillator 1 octave offset"),
    D::number(P::Osc1PulseWidth, "osc1_pulse_width", 0.05, 0.95, 0.5, "", "Oscillator 1 pulse duty cycle"),
    D::waveform(P::Osc2Waveform, "osc2_waveform", Waveform::Sawtooth, "Oscillator 2 shape"),
    D::number(P::Osc2Level, "osc2_level", 0.0, 1.0, 0.5, "", "Oscillator 2 mix level"),
    D::number(P::Osc2Detune, "osc2_detune", -100.0, 100.0, 5.0, "ct", "Oscillator 2 fine tune"),
    D::integer(P::Osc2Octave, "osc2_octave", -2.0, 2.0, "Oscillator 2 octave offset"),
    D::number(P::Osc2PulseWidth, "osc2_pulse_width", 0.05, 0.95, 0.5, "", "Oscillator 2 pulse duty cycle"),
    D::number(P::FilterCutoff, "filter_cutoff", 20.0, 20000.0, 2000.0, "Hz", "Ladder filter cutoff"),
    D::number(P::FilterResonance, "filter_resonance", 0.0, 0.95, 0.3, "", "Ladder filter resonance"),
    D::number(P::FilterEnvAmount, "filter_env_amount", -1.0, 1.0, 0.0, "", "Filter envelope depth (1.0 = 4 octaves)"),
    D::number(P::AmpAttack, "amp_attack", 0.001, 10.0, 0.01, "s", "Amplitude envelope attack"),
    D::number(P::AmpDecay, "amp_decay", 0.001, 10.0, 0.1, "s", "Amplitude envelope decay"),
    D::number(P::AmpSustain, "amp_sustain", 0.0, 1.0, 0.7, "", "Amplitude envelope sustain level"),
    D::number(P::AmpRelease, "amp_release", 0.001, 10.0, 0.3, "s", "Amplitude envelope release"),
    D::number(P::FilterAttack, "filter_attack", 0.001, 10.0, 0.01, "s", "Filter envelope attack"),
    D::number(P::FilterDecay, "filter_decay", 0.001, 10.0, 0.2, "s", "Filter envelope decay"),
    D::number(P::FilterSustain, "filter_sustain", 0.0, 1.0, 0.3, "", "Filter envelope sustain level"),
    D::number(P::FilterRelease, "filter_release", 0.001, 10.0, 0.3, "s", "Filter envelope release"),
    D::waveform(P::LfoWaveform, "lfo_waveform", Waveform::Sine, "LFO shape"),
    D::number(P::LfoRate, "lfo_rate", 0.1, 50.0, 5.0, "Hz", "LFO rate"),
    D::number(P::LfoDepth, "lfo_depth", 0.0, 1.0, 0.3, "", "LFO output depth"),
    D::number(P::LfoToPitch, "lfo_to_pitch", 0.0, 1.0, 0.0, "", "LFO to pitch (1.0 = 2 semitones)"),
    D::number(P::LfoToFilter, "lfo_to_filter", 0.0, 1.0, 0.0, "", "LFO to cutoff (1.0 = 4 octaves)"),
    D::number(P::LfoToPw, "lfo_to_pw", 0.0, 1.0, 0.0, "", "LFO to pulse width (1.0 = 0.4)"),
    D::number(P::MasterVolume, "master_volume", 0.0, 1.0, 0.8, "", "Output level before the soft clipper"),
];

pub(crate) fn waveform_from_raw(raw: f32) -> Waveform {
    Waveform::from_index(raw.max(0.0).round() as usize).unwrap_or_default()
}

/// A parameter value at the control boundary.
///
/// Serialized untagged: numbers as numbers, waveforms as their name.
///
/// ```rust
/// use polyvox_synth::{ParamValue, Waveform};
///
/// let v: ParamValue = serde_json::from_str("\"square\"").unwrap();
/// assert_eq!(v, ParamValue::Waveform(Waveform::Square));
/// let n: ParamValue = serde_json::from_str("0.25").unwrap();
/// assert_eq!(n, ParamValue::Number(0.25));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value.
    Number(f32),
    /// Waveform selection.
    Waveform(#[serde(with = "waveform_name")] Waveform),
}

impl ParamValue {
    /// The numeric value, if this is a number.
    pub fn as_number(self) -> Option<f32> {
        match self {
            ParamValue::Number(n) => Some(n),
            ParamValue::Waveform(_) => None,
        }
    }

    /// The waveform, if this is a waveform.
    pub fn as_waveform(self) -> Option<Waveform> {
        match self {
            ParamValue::Waveform(w) => Some(w),
            ParamValue::Number(_) => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl From<Waveform> for ParamValue {
    fn from(value: Waveform) -> Self {
        ParamValue::Waveform(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Waveform(w) => write!(f, "{w}"),
        }
    }
}

mod waveform_name {
    use polyvox_core::Waveform;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(waveform: &Waveform, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(waveform.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Waveform, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| de::Error::custom(format!("unknown waveform '{name}'")))
    }
}

/// Lock-free parameter storage shared by the control and render sides.
///
/// Single writer per parameter is assumed; the last store wins. Values are
/// clamped before they are stored, so the render side never sees an
/// out-of-range value.
#[derive(Debug)]
pub struct ParamStore {
    values: [AtomicU32; ParamId::COUNT],
}

impl ParamStore {
    /// Store holding every parameter's default.
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|i| AtomicU32::new(PARAMS[i].default.to_bits())),
        }
    }

    /// Clamp and store a raw value. Returns the stored value.
    #[inline]
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        let clamped = id.descriptor().clamp(value);
        self.values[id.index()].store(clamped.to_bits(), Ordering::Release);
        clamped
    }

    /// Load a raw value.
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Acquire))
    }

    /// Restore every parameter to its default.
    pub fn reset(&self) {
        for id in ParamId::ALL {
            self.set(id, id.descriptor().default);
        }
    }

    /// Read every voice-level parameter in one pass.
    pub fn snapshot(&self) -> VoiceParams {
        VoiceParams::from_fn(|id| self.get(id))
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}
