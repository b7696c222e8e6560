//! The polyphonic synthesizer: control handle, render engine, and the
//! single-threaded bundle of both.
//!
//! # Threading
//!
//! [`SynthHandle`] is the control side. It is cheap to clone and can be
//! shared between threads. It writes parameters into per-parameter atomics
//! and queues note events on a bounded channel; neither ever blocks.
//!
//! [`SynthEngine`] is the render side and belongs to the audio thread. At
//! the start of every `generate_into` call it drains the event queue and
//! reads one parameter snapshot, then renders in chunks of up to
//! `max_block_size` samples. Nothing on this path locks, allocates or logs.
//!
//! ```rust
//! use polyvox_synth::Synth;
//!
//! let (handle, mut engine) = Synth::new(44100.0).split();
//!
//! let control = std::thread::spawn(move || {
//!     handle.set_parameter("filter_cutoff", 800.0).unwrap();
//!     handle.note_on(60, 100).unwrap();
//! });
//! control.join().unwrap();
//!
//! let mut block = [0.0f32; 256];
//! engine.generate_into(&mut block);
//! assert_eq!(engine.active_voice_count(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_channel::Receiver;
use polyvox_core::{Effect, EffectChain, SmoothedParam, soft_clip};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::SynthError;
use crate::event::{EventSender, SynthEvent, event_queue};
use crate::params::{ParamId, ParamStore, ParamValue};
use crate::voice_manager::{NOTE_COUNT, StealPolicy, VoiceManager};

/// Master volume smoothing time in milliseconds.
const MASTER_SMOOTHING_MS: f32 = 10.0;

/// State shared between the handle and the engine.
#[derive(Debug)]
struct SharedState {
    params: ParamStore,
    active_voices: AtomicUsize,
    playing_notes: [AtomicU64; 2],
    fault_count: AtomicU64,
}

impl SharedState {
    fn new() -> Self {
        Self {
            params: ParamStore::new(),
            active_voices: AtomicUsize::new(0),
            playing_notes: [AtomicU64::new(0), AtomicU64::new(0)],
            fault_count: AtomicU64::new(0),
        }
    }

    fn playing_notes(&self) -> Vec<u8> {
        let bits = [
            self.playing_notes[0].load(Ordering::Acquire),
            self.playing_notes[1].load(Ordering::Acquire),
        ];
        (0..NOTE_COUNT)
            .filter(|&n| bits[n / 64] & (1 << (n % 64)) != 0)
            .map(|n| n as u8)
            .collect()
    }
}

/// Snapshot of engine status for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthState {
    /// Voices sounding after the last rendered block.
    pub active_voices: usize,
    /// Notes held after the last rendered block, ascending.
    pub playing_notes: Vec<u8>,
    /// Current master volume setting.
    pub master_volume: f32,
    /// Blocks discarded because they contained non-finite samples.
    pub fault_count: u64,
}

/// Control side of the synthesizer.
///
/// All methods are non-blocking and safe to call from any thread.
#[derive(Debug, Clone)]
pub struct SynthHandle {
    shared: Arc<SharedState>,
    events: EventSender,
}

impl SynthHandle {
    /// Queue a note-on. Velocity is clamped to 127; velocity 0 releases.
    pub fn note_on(&self, note: u8, velocity: u8) -> Result<(), SynthError> {
        if note as usize >= NOTE_COUNT {
            tracing::warn!(note, "note_on rejected: note out of range");
            return Err(SynthError::InvalidNote(note));
        }
        let velocity = velocity.min(127);
        tracing::debug!(note, velocity, "note_on");
        self.send(SynthEvent::NoteOn { note, velocity })
    }

    /// Queue a note-off.
    pub fn note_off(&self, note: u8) -> Result<(), SynthError> {
        if note as usize >= NOTE_COUNT {
            tracing::warn!(note, "note_off rejected: note out of range");
            return Err(SynthError::InvalidNote(note));
        }
        tracing::debug!(note, "note_off");
        self.send(SynthEvent::NoteOff { note })
    }

    /// Queue a release of every sounding voice.
    pub fn all_notes_off(&self) -> Result<(), SynthError> {
        tracing::debug!("all_notes_off");
        self.send(SynthEvent::AllNotesOff)
    }

    /// Queue an immediate silence of every voice.
    pub fn panic(&self) -> Result<(), SynthError> {
        tracing::debug!("panic");
        self.send(SynthEvent::Panic)
    }

    /// Queue a change of voice steal policy.
    pub fn set_steal_policy(&self, policy: StealPolicy) -> Result<(), SynthError> {
        tracing::debug!(%policy, "set_steal_policy");
        self.send(SynthEvent::SetStealPolicy(policy))
    }

    fn send(&self, event: SynthEvent) -> Result<(), SynthError> {
        self.events.send(event).inspect_err(|e| {
            tracing::warn!(?event, error = %e, "event dropped");
        })
    }

    /// Set a parameter by name. Numeric values are clamped to range.
    pub fn set_parameter(&self, name: &str, value: impl Into<ParamValue>) -> Result<(), SynthError> {
        let id = self.lookup(name)?;
        let raw = id.descriptor().to_raw(value.into())?;
        let stored = self.shared.params.set(id, raw);
        tracing::debug!(param = name, value = stored, "parameter set");
        Ok(())
    }

    /// Set a parameter from text: a waveform name or a number.
    pub fn set_parameter_str(&self, name: &str, text: &str) -> Result<(), SynthError> {
        let id = self.lookup(name)?;
        let value = id.descriptor().parse(text)?;
        self.set_parameter(name, value)
    }

    /// Read a parameter by name.
    pub fn get_parameter(&self, name: &str) -> Result<ParamValue, SynthError> {
        let id = self.lookup(name)?;
        Ok(id.descriptor().to_value(self.shared.params.get(id)))
    }

    /// Set a parameter by id, returning the stored (clamped) value.
    ///
    /// Waveform parameters take the variant index.
    pub fn set_param(&self, id: ParamId, value: f32) -> f32 {
        self.shared.params.set(id, value)
    }

    /// Read a parameter's raw value by id.
    pub fn get_param(&self, id: ParamId) -> f32 {
        self.shared.params.get(id)
    }

    /// Apply many parameters. Every entry is attempted; the first error
    /// encountered is returned afterwards.
    pub fn set_parameters<I, S, V>(&self, values: I) -> Result<(), SynthError>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<ParamValue>,
    {
        let mut first_error = None;
        for (name, value) in values {
            if let Err(e) = self.set_parameter(name.as_ref(), value) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Every parameter by name.
    pub fn get_parameters(&self) -> BTreeMap<String, ParamValue> {
        ParamId::ALL
            .iter()
            .map(|&id| {
                let value = id.descriptor().to_value(self.shared.params.get(id));
                (id.name().to_string(), value)
            })
            .collect()
    }

    /// Restore every parameter to its default.
    pub fn reset_parameters(&self) {
        tracing::debug!("parameters reset");
        self.shared.params.reset();
    }

    /// Voices sounding after the last rendered block.
    pub fn active_voice_count(&self) -> usize {
        self.shared.active_voices.load(Ordering::Acquire)
    }

    /// Blocks discarded because they contained non-finite samples.
    pub fn fault_count(&self) -> u64 {
        self.shared.fault_count.load(Ordering::Acquire)
    }

    /// Diagnostics snapshot.
    pub fn state(&self) -> SynthState {
        SynthState {
            active_voices: self.active_voice_count(),
            playing_notes: self.shared.playing_notes(),
            master_volume: self.shared.params.get(ParamId::MasterVolume),
            fault_count: self.fault_count(),
        }
    }

    fn lookup(&self, name: &str) -> Result<ParamId, SynthError> {
        ParamId::from_name(name).ok_or_else(|| {
            tracing::warn!(param = name, "unknown parameter");
            SynthError::UnknownParameter(name.to_string())
        })
    }
}

/// Render side of the synthesizer.
pub struct SynthEngine {
    shared: Arc<SharedState>,
    events: Receiver<SynthEvent>,
    voices: VoiceManager,
    effects: EffectChain,
    master: SmoothedParam,
    max_block_size: usize,
}

impl core::fmt::Debug for SynthEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SynthEngine")
            .field("voices", &self.voices.polyphony())
            .field("effects", &self.effects.len())
            .field("max_block_size", &self.max_block_size)
            .finish_non_exhaustive()
    }
}

impl SynthEngine {
    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.voices.sample_rate()
    }

    /// Voice pool, for inspection.
    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    /// Voices currently sounding.
    pub fn active_voice_count(&self) -> usize {
        self.voices.active_voice_count()
    }

    /// Post-mix effect chain.
    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    /// Append a stage to the post-mix effect chain.
    pub fn push_effect(&mut self, mut stage: Box<dyn Effect + Send>) {
        stage.set_sample_rate(self.sample_rate());
        self.effects.push(stage);
    }

    /// Render `num_samples` samples into a new buffer.
    ///
    /// Allocates; audio callbacks should use [`generate_into`](Self::generate_into).
    pub fn generate(&mut self, num_samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; num_samples];
        self.generate_into(&mut out);
        out
    }

    /// Render into `out`. Every sample is in [-1, 1].
    ///
    /// Queued events and the parameter snapshot are taken once, before the
    /// first sample, so nothing sent during the call lands inside `out`.
    ///
    /// If the mix turns non-finite the whole buffer is silenced, every voice
    /// is reset and the fault counter is incremented.
    pub fn generate_into(&mut self, out: &mut [f32]) {
        while let Ok(event) = self.events.try_recv() {
            event.apply(&mut self.voices);
        }

        let params = self.shared.params.snapshot();
        self.voices.set_params(&params);
        self.master
            .set_target(self.shared.params.get(ParamId::MasterVolume));

        let faulted = out
            .chunks_mut(self.max_block_size)
            .any(|block| !self.render_block(block));

        if faulted {
            out.fill(0.0);
            self.voices.panic();
            self.effects.reset();
            self.shared.fault_count.fetch_add(1, Ordering::AcqRel);
        }
        self.publish();
    }

    /// Returns `false` if the block contained a non-finite sample.
    fn render_block(&mut self, block: &mut [f32]) -> bool {
        self.voices.generate(block);
        self.effects.process(block);

        if block.iter().any(|s| !s.is_finite()) {
            return false;
        }

        for sample in block.iter_mut() {
            *sample = soft_clip(*sample * self.master.advance());
        }
        true
    }

    fn publish(&self) {
        self.shared
            .active_voices
            .store(self.voices.active_voice_count(), Ordering::Release);
        let bits = self.voices.note_bitmap();
        self.shared.playing_notes[0].store(bits[0], Ordering::Release);
        self.shared.playing_notes[1].store(bits[1], Ordering::Release);
    }
}

/// A synthesizer with both halves in one value, for single-threaded use.
///
/// Note events are queued and take effect on the next `generate` call.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{ParamValue, Synth};
///
/// let mut synth = Synth::new(44100.0);
/// synth.set_parameter("filter_resonance", 1.5).unwrap();
/// assert_eq!(synth.get_parameter("filter_resonance").unwrap(), ParamValue::Number(0.95));
///
/// synth.note_on(60, 100).unwrap();
/// let out = synth.generate(512);
/// assert_eq!(out.len(), 512);
/// assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
/// ```
#[derive(Debug)]
pub struct Synth {
    handle: SynthHandle,
    engine: SynthEngine,
}

impl Synth {
    /// Synth with default settings at `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let config = EngineConfig::default();
        Self::build(sample_rate, &config)
    }

    /// Synth from a validated config, with its initial parameters applied.
    pub fn with_config(config: &EngineConfig) -> Result<Self, SynthError> {
        config.validate()?;
        let mut synth = Self::build(config.sample_rate as f32, config);
        synth
            .handle
            .set_parameters(config.params.iter().map(|(k, v)| (k, *v)))?;
        synth
            .engine
            .master
            .set_immediate(synth.handle.get_param(ParamId::MasterVolume));
        Ok(synth)
    }

    fn build(sample_rate: f32, config: &EngineConfig) -> Self {
        let shared = Arc::new(SharedState::new());
        let (events, receiver) = event_queue(config.event_queue_capacity);
        let fade_samples = (config.fade_ms.max(0.0) * 0.001 * sample_rate).round() as u32;

        let master = SmoothedParam::with_config(
            shared.params.get(ParamId::MasterVolume),
            sample_rate,
            MASTER_SMOOTHING_MS,
        );

        let mut voices = VoiceManager::new(sample_rate, config.polyphony, fade_samples);
        voices.set_steal_policy(config.steal_policy);

        tracing::info!(
            sample_rate,
            polyphony = config.polyphony,
            queue = config.event_queue_capacity,
            steal_policy = %config.steal_policy,
            "synth engine created"
        );

        Self {
            handle: SynthHandle {
                shared: Arc::clone(&shared),
                events,
            },
            engine: SynthEngine {
                shared,
                events: receiver,
                voices,
                effects: EffectChain::new(),
                master,
                max_block_size: config.max_block_size.max(1),
            },
        }
    }

    /// Separate the control and render halves.
    pub fn split(self) -> (SynthHandle, SynthEngine) {
        (self.handle, self.engine)
    }

    /// Control half.
    pub fn handle(&self) -> &SynthHandle {
        &self.handle
    }

    /// Render half.
    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }

    /// Mutable render half.
    pub fn engine_mut(&mut self) -> &mut SynthEngine {
        &mut self.engine
    }

    /// See [`SynthHandle::note_on`].
    pub fn note_on(&self, note: u8, velocity: u8) -> Result<(), SynthError> {
        self.handle.note_on(note, velocity)
    }

    /// See [`SynthHandle::note_off`].
    pub fn note_off(&self, note: u8) -> Result<(), SynthError> {
        self.handle.note_off(note)
    }

    /// See [`SynthHandle::all_notes_off`].
    pub fn all_notes_off(&self) -> Result<(), SynthError> {
        self.handle.all_notes_off()
    }

    /// See [`SynthHandle::panic`].
    pub fn panic(&self) -> Result<(), SynthError> {
        self.handle.panic()
    }

    /// See [`SynthHandle::set_steal_policy`].
    pub fn set_steal_policy(&self, policy: StealPolicy) -> Result<(), SynthError> {
        self.handle.set_steal_policy(policy)
    }

    /// See [`SynthHandle::set_parameter`].
    pub fn set_parameter(&self, name: &str, value: impl Into<ParamValue>) -> Result<(), SynthError> {
        self.handle.set_parameter(name, value)
    }

    /// See [`SynthHandle::get_parameter`].
    pub fn get_parameter(&self, name: &str) -> Result<ParamValue, SynthError> {
        self.handle.get_parameter(name)
    }

    /// See [`SynthHandle::set_parameters`].
    pub fn set_parameters<I, S, V>(&self, values: I) -> Result<(), SynthError>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<ParamValue>,
    {
        self.handle.set_parameters(values)
    }

    /// See [`SynthHandle::get_parameters`].
    pub fn get_parameters(&self) -> BTreeMap<String, ParamValue> {
        self.handle.get_parameters()
    }

    /// See [`SynthEngine::generate`].
    pub fn generate(&mut self, num_samples: usize) -> Vec<f32> {
        self.engine.generate(num_samples)
    }

    /// See [`SynthEngine::generate_into`].
    pub fn generate_into(&mut self, out: &mut [f32]) {
        self.engine.generate_into(out);
    }

    /// Voices currently sounding.
    pub fn active_voice_count(&self) -> usize {
        self.engine.active_voice_count()
    }

    /// Blocks discarded because they contained non-finite samples.
    pub fn fault_count(&self) -> u64 {
        self.handle.fault_count()
    }

    /// Diagnostics snapshot.
    pub fn state(&self) -> SynthState {
        self.handle.state()
    }
}
