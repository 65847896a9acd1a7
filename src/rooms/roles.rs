use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::room::{Role, Room};

/// Source of the index used to pick the Questioner.
pub trait RoleSelector: Send {
    /// Returns an index in `0..len`. Only called with `len > 0`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform selection backed by `StdRng`.
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RoleSelector for RandomSelector {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Makes exactly one participant the Questioner and everyone else an
/// Answerer, overwriting any earlier assignment.
///
/// Returns the new Questioner, or `None` for an empty room.
pub fn assign_roles(room: &mut Room, selector: &mut dyn RoleSelector) -> Option<String> {
    let len = room.len();
    if len == 0 {
        return None;
    }

    let chosen = selector.pick(len) % len;
    for (index, participant) in room.participants_mut().iter_mut().enumerate() {
        participant.role = if index == chosen {
            Role::Questioner
        } else {
            Role::Answerer
        };
    }

    Some(room.participants()[chosen].username.clone())
}
