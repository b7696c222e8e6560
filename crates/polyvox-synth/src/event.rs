//! Control → render note events.
//!
//! Events travel through a bounded `crossbeam_channel`. The render side
//! drains every pending event at the start of a buffer, so events apply in
//! FIFO order at buffer boundaries.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::error::SynthError;
use crate::voice_manager::{StealPolicy, VoiceManager};

/// Default event queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A note event queued for the render side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    /// Start or retrigger a note. Velocity 0 behaves as [`SynthEvent::NoteOff`].
    NoteOn {
        /// MIDI note, 0..=127.
        note: u8,
        /// MIDI velocity, 0..=127.
        velocity: u8,
    },
    /// Release a note.
    NoteOff {
        /// MIDI note, 0..=127.
        note: u8,
    },
    /// Release every sounding voice.
    AllNotesOff,
    /// Silence every voice immediately.
    Panic,
    /// Change how busy voices are stolen.
    SetStealPolicy(StealPolicy),
}

impl SynthEvent {
    /// Apply this event to a voice pool.
    pub fn apply(self, voices: &mut VoiceManager) {
        match self {
            SynthEvent::NoteOn { note, velocity } => {
                voices.note_on(note, velocity);
            }
            SynthEvent::NoteOff { note } => voices.note_off(note),
            SynthEvent::AllNotesOff => voices.all_notes_off(),
            SynthEvent::Panic => voices.panic(),
            SynthEvent::SetStealPolicy(policy) => voices.set_steal_policy(policy),
        }
    }
}

/// Create a bounded event queue.
pub fn event_queue(capacity: usize) -> (EventSender, Receiver<SynthEvent>) {
    let (tx, rx) = bounded(capacity.max(1));
    (EventSender { tx }, rx)
}

/// Control-side end of the event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<SynthEvent>,
}

impl EventSender {
    /// Queue an event without blocking.
    pub fn send(&self, event: SynthEvent) -> Result<(), SynthError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SynthError::QueueFull,
            TrySendError::Disconnected(_) => SynthError::Disconnected,
        })
    }

    /// Events waiting to be drained.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}
