//! Effect stage contract.
//!
//! The synth treats every post-mix processor as a uniform stage: it receives
//! the summed mono buffer, processes it in place (so the output length always
//! equals the input length), can be bypassed, and can be reset.
//!
//! ## Design Decisions
//!
//! - **Mono processing**: one `f32` per sample, matching the mono voice mix.
//! - **Object-safe**: stages are stored as `Box<dyn Effect + Send>` in an
//!   [`EffectChain`], so effects can be plugged in at runtime.
//! - **No allocations**: `process` and `reset` are called from the render
//!   context and must not allocate.

/// Core trait for post-mix effect stages.
///
/// # Example
///
/// ```rust
/// use polyvox_core::Effect;
///
/// struct Gain {
///     gain: f32,
/// }
///
/// impl Effect for Gain {
///     fn process_sample(&mut self, input: f32) -> f32 {
///         input * self.gain
///     }
///
///     fn reset(&mut self) {}
/// }
///
/// let mut g = Gain { gain: 0.5 };
/// let mut buf = [1.0, -1.0];
/// g.process(&mut buf);
/// assert_eq!(buf, [0.5, -0.5]);
/// ```
pub trait Effect {
    /// Process a single sample.
    fn process_sample(&mut self, input: f32) -> f32;

    /// Process a buffer in place.
    ///
    /// Default implementation calls [`process_sample`](Self::process_sample)
    /// for each sample.
    fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clear internal state (filter memory, delay lines) without touching
    /// parameters.
    fn reset(&mut self);

    /// Update the sample rate. Stateless effects can ignore it.
    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    /// Whether the stage currently processes audio.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Enable or bypass the stage. Stages that cannot be bypassed ignore it.
    fn set_enabled(&mut self, _enabled: bool) {}
}

/// Bypass wrapper giving any [`Effect`] an `enabled` flag.
///
/// Resets the wrapped effect whenever it is re-enabled, so a stage never
/// resumes with stale state.
#[derive(Debug, Clone)]
pub struct Stage<E> {
    effect: E,
    enabled: bool,
}

impl<E: Effect> Stage<E> {
    /// Wrap an effect, enabled.
    pub fn new(effect: E) -> Self {
        Self {
            effect,
            enabled: true,
        }
    }

    /// Reference to the wrapped effect.
    pub fn inner(&self) -> &E {
        &self.effect
    }

    /// Mutable reference to the wrapped effect.
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.effect
    }
}

impl<E: Effect> Effect for Stage<E> {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if self.enabled {
            self.effect.process_sample(input)
        } else {
            input
        }
    }

    fn process(&mut self, buffer: &mut [f32]) {
        if self.enabled {
            self.effect.process(buffer);
        }
    }

    fn reset(&mut self) {
        self.effect.reset();
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.effect.set_sample_rate(sample_rate);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.effect.reset();
        }
        self.enabled = enabled;
    }
}

/// Ordered list of effect stages applied after the voice mix.
///
/// Disabled stages are skipped. Building the chain allocates, so do it on
/// the control side before handing the engine to the render thread.
#[cfg(feature = "std")]
#[derive(Default)]
pub struct EffectChain {
    stages: Vec<Box<dyn Effect + Send>>,
}

#[cfg(feature = "std")]
impl EffectChain {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage at the end of the chain.
    pub fn push(&mut self, stage: Box<dyn Effect + Send>) {
        self.stages.push(stage);
        #[cfg(feature = "tracing")]
        tracing::debug!("effect_chain: pushed stage {}", self.stages.len() - 1);
    }

    /// Remove and return the stage at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Effect + Send>> {
        if index >= self.stages.len() {
            #[cfg(feature = "tracing")]
            tracing::warn!("effect_chain: no stage at index {index}");
            return None;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("effect_chain: removed stage {index}");
        Some(self.stages.remove(index))
    }

    /// Number of stages, enabled or not.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Mutable access to one stage, e.g. to toggle `enabled`.
    pub fn stage_mut(&mut self, index: usize) -> Option<&mut (dyn Effect + Send + 'static)> {
        self.stages.get_mut(index).map(|s| &mut **s)
    }

    /// Run every enabled stage over `buffer` in order.
    pub fn process(&mut self, buffer: &mut [f32]) {
        for stage in &mut self.stages {
            if stage.is_enabled() {
                stage.process(buffer);
            }
        }
    }

    /// Reset every stage.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Propagate a sample-rate change to every stage.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for stage in &mut self.stages {
            stage.set_sample_rate(sample_rate);
        }
    }
}

#[cfg(feature = "std")]
impl core::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EffectChain")
            .field("stages", &self.stages.len())
            .finish()
    }
}
