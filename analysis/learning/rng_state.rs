//! Capturing and restoring a random generator's position in its stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Seedable uniform generator whose state can be snapshotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    rng: ChaCha8Rng,
}

/// Serializable snapshot of a [`Generator`].
///
/// Restoring it places the generator exactly where it was when captured, so
/// the next draw repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorState {
    /// Key the generator was seeded with.
    pub seed: [u8; 32],
    /// Stream selector.
    pub stream: u64,
    /// Offset, in 32-bit words, into the keystream.
    pub word_pos: u128,
}

/// Draws recorded by [`demonstrate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateDemo {
    /// Draw made before the state was captured.
    pub first: f64,
    /// Draw made right after capturing.
    pub captured_next: f64,
    /// Draw made after restoring the capture; equals `captured_next`.
    pub restored_next: f64,
}

impl Generator {
    /// Deterministic generator for `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Uniform value in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Captures the current position.
    #[must_use]
    pub fn state(&self) -> GeneratorState {
        GeneratorState {
            seed: self.rng.get_seed(),
            stream: self.rng.get_stream(),
            word_pos: self.rng.get_word_pos(),
        }
    }

    /// Rewinds or advances to a captured position.
    pub fn set_state(&mut self, state: &GeneratorState) {
        let mut rng = ChaCha8Rng::from_seed(state.seed);
        rng.set_stream(state.stream);
        rng.set_word_pos(state.word_pos);
        self.rng = rng;
    }
}

/// Draws once, captures the state, draws again, restores, and draws a third
/// time.
pub fn demonstrate(generator: &mut Generator) -> StateDemo {
    let first = generator.random();
    let state = generator.state();
    let captured_next = generator.random();
    generator.set_state(&state);
    let restored_next = generator.random();
    StateDemo {
        first,
        captured_next,
        restored_next,
    }
}
