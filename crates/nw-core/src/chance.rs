//! Chance policies: every probability-driven game decision behind one seam.
//!
//! Resolvers and the automated-participant controller never touch an RNG
//! directly. They ask a [`Chance`] policy, which the real game backs with
//! a d100 roll ([`DiceChance`]) and tests back with fixed outcomes
//! ([`ForcedChance`]) or a known seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chance that the mafia's gun jams and the night kill is voided.
pub const MISFIRE_PERCENT: u32 = 5;

/// Chance that an investigation reports the wrong alignment.
pub const INVESTIGATION_ERROR_PERCENT: u32 = 5;

/// Chance that the rope breaks and a voted-out player survives.
pub const ROPE_BREAK_PERCENT: u32 = 5;

/// Chance that a session is created with a special event active.
pub const SPECIAL_EVENT_PERCENT: u32 = 30;

/// Chance that an automated participant holding an item throws it at all.
pub const BOT_THROW_PERCENT: u32 = 50;

/// A source for every random decision the game makes.
///
/// One method per decision kind, so a test policy can force a single
/// perk on or off without disturbing the others.
pub trait Chance {
    /// A uniform draw in `0..bound`. `bound` is never 0 at call sites.
    fn index(&mut self, bound: usize) -> usize;

    /// Does the mafia's shot misfire tonight?
    fn misfire(&mut self) -> bool;

    /// Does the detective's intuition fail on this target?
    fn investigation_error(&mut self) -> bool;

    /// Does the rope break at the gallows?
    fn rope_breaks(&mut self) -> bool;

    /// Is a special event active for this new session?
    fn special_event(&mut self) -> bool;

    /// Does this participant receive the event item? (`percent` comes
    /// from the event descriptor.)
    fn grants_item(&mut self, percent: u32) -> bool;

    /// Does a thrown item connect? (`percent` comes from the event
    /// descriptor.)
    fn item_hits(&mut self, percent: u32) -> bool;

    /// Does an automated participant bother throwing its item tonight?
    fn bot_throws(&mut self) -> bool;

    /// An even yes/no draw (automated final votes).
    fn coin_flip(&mut self) -> bool;
}

/// The production policy: d100 rolls from a seedable [`StdRng`].
#[derive(Debug)]
pub struct DiceChance {
    rng: StdRng,
}

impl DiceChance {
    /// A policy seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// A policy with a fixed seed, for reproducible games and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn roll(&mut self, percent: u32) -> bool {
        let roll: u32 = self.rng.random_range(1..=100);
        roll <= percent
    }
}

impl Default for DiceChance {
    fn default() -> Self {
        Self::new()
    }
}

impl Chance for DiceChance {
    fn index(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }

    fn misfire(&mut self) -> bool {
        self.roll(MISFIRE_PERCENT)
    }

    fn investigation_error(&mut self) -> bool {
        self.roll(INVESTIGATION_ERROR_PERCENT)
    }

    fn rope_breaks(&mut self) -> bool {
        self.roll(ROPE_BREAK_PERCENT)
    }

    fn special_event(&mut self) -> bool {
        self.roll(SPECIAL_EVENT_PERCENT)
    }

    fn grants_item(&mut self, percent: u32) -> bool {
        self.roll(percent)
    }

    fn item_hits(&mut self, percent: u32) -> bool {
        self.roll(percent)
    }

    fn bot_throws(&mut self) -> bool {
        self.roll(BOT_THROW_PERCENT)
    }

    fn coin_flip(&mut self) -> bool {
        self.roll(50)
    }
}

/// A test policy with every outcome pinned.
///
/// Defaults to "no perk ever fires, every grant fails, coin lands on
/// no, index picks the first element". Set individual fields to force a
/// single decision without touching the rest.
#[derive(Debug, Clone, Default)]
pub struct ForcedChance {
    /// Force the mafia misfire perk.
    pub misfire: bool,
    /// Force the investigation error perk.
    pub investigation_error: bool,
    /// Force the rope-break perk.
    pub rope_breaks: bool,
    /// Force special-event selection at session creation.
    pub special_event: bool,
    /// Force item grants to succeed.
    pub grants_item: bool,
    /// Force thrown items to hit.
    pub item_hits: bool,
    /// Force automated participants to throw held items.
    pub bot_throws: bool,
    /// Pin the coin flip.
    pub coin_flip: bool,
}

impl Chance for ForcedChance {
    fn index(&mut self, _bound: usize) -> usize {
        0
    }

    fn misfire(&mut self) -> bool {
        self.misfire
    }

    fn investigation_error(&mut self) -> bool {
        self.investigation_error
    }

    fn rope_breaks(&mut self) -> bool {
        self.rope_breaks
    }

    fn special_event(&mut self) -> bool {
        self.special_event
    }

    fn grants_item(&mut self, _percent: u32) -> bool {
        self.grants_item
    }

    fn item_hits(&mut self, _percent: u32) -> bool {
        self.item_hits
    }

    fn bot_throws(&mut self) -> bool {
        self.bot_throws
    }

    fn coin_flip(&mut self) -> bool {
        self.coin_flip
    }
}

/// Fisher–Yates shuffle driven by a [`Chance`] policy.
pub fn shuffle<T>(chance: &mut dyn Chance, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = chance.index(i + 1);
        items.swap(i, j);
    }
}

/// Pick one element uniformly, or `None` from an empty slice.
pub fn pick<'a, T>(chance: &mut dyn Chance, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[chance.index(items.len())])
    }
}
