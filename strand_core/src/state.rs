//! Generator state management.
//!
//! This module provides the `GeneratorHeader` which uses tagged encoding to
//! pack both the lifecycle state AND the resume index into a single u32, so a
//! reentrancy check and a "where am I suspended" query are one read.
//!
//! # Encoding
//!
//! ```text
//! Bits 0-1:  State (SuspendedStart=0, Executing=1, SuspendedYield=2, Completed=3)
//! Bits 2-31: Resume index (number of suspensions so far, max 2^30 - 1)
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! SuspendedStart ──try_start──► Executing ──suspend──► SuspendedYield
//!                                   │  ▲                     │
//!                                   │  └─────try_start───────┘
//!                                   └──complete──► Completed (terminal)
//! ```

use std::cell::Cell;
use std::fmt;

// ============================================================================
// Generator State
// ============================================================================

/// Generator lifecycle state.
///
/// Packed into 2 bits for single-instruction comparison.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratorState {
    /// Created but never advanced.
    #[default]
    SuspendedStart = 0,
    /// Currently running its body (reentry check).
    Executing = 1,
    /// Paused at a suspension point.
    SuspendedYield = 2,
    /// Returned, failed, or was terminated. Never leaves this state.
    Completed = 3,
}

impl GeneratorState {
    /// Number of bits used to encode state.
    pub const BITS: u32 = 2;

    /// Mask for extracting state from header.
    pub const MASK: u32 = (1 << Self::BITS) - 1;

    /// Creates state from raw 2-bit value.
    #[inline(always)]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & Self::MASK {
            0 => Self::SuspendedStart,
            1 => Self::Executing,
            2 => Self::SuspendedYield,
            _ => Self::Completed,
        }
    }

    /// Returns true if the generator can be resumed.
    #[inline(always)]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::SuspendedStart | Self::SuspendedYield)
    }

    /// Returns true if the generator is finished.
    #[inline(always)]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns the conventional name for this state.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SuspendedStart => "suspendedStart",
            Self::Executing => "executing",
            Self::SuspendedYield => "suspendedYield",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Generator Header
// ============================================================================

/// Tagged header combining state and resume index.
///
/// # Memory Layout
///
/// ```text
/// +-------------------+-------+
/// | Resume Index (30) | State |
/// |                   | (2)   |
/// +-------------------+-------+
/// MSB                       LSB
/// ```
///
/// A handle is only ever driven from one thread, so the bits live in a
/// plain `Cell`. The header is read before any borrow of the generator
/// frame is taken, which is what lets a reentrant call be rejected cleanly.
#[repr(transparent)]
#[derive(Clone, Default)]
pub struct GeneratorHeader {
    bits: Cell<u32>,
}

impl GeneratorHeader {
    /// Maximum resume index (2^30 - 1).
    pub const MAX_RESUME_INDEX: u32 = (1 << 30) - 1;

    const RESUME_SHIFT: u32 = GeneratorState::BITS;

    /// Creates a new header in `SuspendedStart` with resume index 0.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    const fn pack(state: GeneratorState, resume_index: u32) -> u32 {
        (resume_index << Self::RESUME_SHIFT) | (state as u32)
    }

    /// Gets the current state.
    #[inline(always)]
    pub fn state(&self) -> GeneratorState {
        GeneratorState::from_bits(self.bits.get())
    }

    /// Gets the current resume index.
    #[inline(always)]
    pub fn resume_index(&self) -> u32 {
        self.bits.get() >> Self::RESUME_SHIFT
    }

    /// Gets both state and resume index from one read.
    #[inline(always)]
    pub fn state_and_index(&self) -> (GeneratorState, u32) {
        let bits = self.bits.get();
        (GeneratorState::from_bits(bits), bits >> Self::RESUME_SHIFT)
    }

    #[inline(always)]
    fn replace_state(&self, state: GeneratorState) {
        let bits = self.bits.get();
        self.bits.set((bits & !GeneratorState::MASK) | (state as u32));
    }

    /// Transitions to `Executing` if currently resumable.
    ///
    /// Returns the previous state on success, `None` if the generator is
    /// already executing or has completed.
    #[inline]
    pub fn try_start(&self) -> Option<GeneratorState> {
        let state = self.state();
        if !state.is_resumable() {
            return None;
        }
        self.replace_state(GeneratorState::Executing);
        Some(state)
    }

    /// Transitions to `SuspendedYield`, bumping the resume index.
    ///
    /// Only valid while `Executing`. Returns the new resume index.
    #[inline]
    pub fn suspend(&self) -> u32 {
        let (state, index) = self.state_and_index();
        debug_assert_eq!(state, GeneratorState::Executing);
        let next = (index + 1).min(Self::MAX_RESUME_INDEX);
        self.bits.set(Self::pack(GeneratorState::SuspendedYield, next));
        next
    }

    /// Puts an executing generator back into the state it was resumed from.
    ///
    /// Only for resumptions rejected before the body ran.
    #[inline]
    pub fn restore(&self, previous: GeneratorState) {
        debug_assert!(previous.is_resumable());
        self.replace_state(previous);
    }

    /// Transitions to `Completed`. The resume index is kept for debugging.
    #[inline]
    pub fn complete(&self) {
        self.replace_state(GeneratorState::Completed);
    }

    /// Returns true if the generator has completed.
    #[inline(always)]
    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }
}

impl fmt::Debug for GeneratorHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, index) = self.state_and_index();
        f.debug_struct("GeneratorHeader")
            .field("state", &state)
            .field("resume_index", &index)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
