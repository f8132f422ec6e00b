//! Play-order bookkeeping.
//!
//! The playlist never touches files. It only decides which catalog index
//! plays next under the current [`PlayMode`] and `repeat` flag.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::types::PlayMode;

/// Outcome of moving the cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Open this catalog index.
    Open(usize),
    /// Nothing left to play under a non-repeating policy.
    Drained,
}

pub struct Playlist {
    /// Catalog indices in play order. Shuffled on entering shuffle mode and
    /// left as-is when leaving it.
    order: Vec<usize>,
    /// Position in `order` of the current track; `None` before start and once drained.
    cursor: Option<usize>,
    /// Catalog indices already played in the current shuffle pass.
    played: HashSet<usize>,
    mode: PlayMode,
    repeat: bool,
    rng: StdRng,
}

impl Playlist {
    pub fn new(len: usize, mode: PlayMode, repeat: bool) -> Self {
        Self::with_rng(len, mode, repeat, StdRng::from_os_rng())
    }

    /// Deterministic constructor for tests and reproducible runs.
    pub fn seeded(len: usize, mode: PlayMode, repeat: bool, seed: u64) -> Self {
        Self::with_rng(len, mode, repeat, StdRng::seed_from_u64(seed))
    }

    fn with_rng(len: usize, mode: PlayMode, repeat: bool, rng: StdRng) -> Self {
        let mut playlist = Self {
            order: (0..len).collect(),
            cursor: None,
            played: HashSet::new(),
            mode,
            repeat,
            rng,
        };
        if mode == PlayMode::Shuffle {
            playlist.order.shuffle(&mut playlist.rng);
        }
        playlist
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    /// Catalog index under the cursor.
    pub fn current(&self) -> Option<usize> {
        self.cursor.map(|pos| self.order[pos])
    }

    /// Catalog indices played so far in this shuffle pass.
    pub fn played(&self) -> &HashSet<usize> {
        &self.played
    }

    /// Current play order (catalog indices).
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Pick the first track. Shuffle starts on a random track.
    pub fn start(&mut self) -> Advance {
        self.cursor = None;
        self.played.clear();
        match self.mode {
            PlayMode::Shuffle => self.advance_shuffle(),
            PlayMode::Sequential | PlayMode::RepeatOne => self.place(0),
        }
    }

    /// Policy-driven advance, used when the current track runs out.
    pub fn advance(&mut self) -> Advance {
        match self.mode {
            PlayMode::Sequential => self.advance_sequential(),
            PlayMode::Shuffle => self.advance_shuffle(),
            PlayMode::RepeatOne => match self.cursor {
                Some(pos) => Advance::Open(self.order[pos]),
                None => self.place(0),
            },
        }
    }

    /// Manual "next". Identical to [`advance`](Self::advance) except that
    /// repeat-one moves on instead of replaying the same track.
    pub fn skip(&mut self) -> Advance {
        match self.mode {
            PlayMode::Shuffle => self.advance_shuffle(),
            PlayMode::Sequential | PlayMode::RepeatOne => self.advance_sequential(),
        }
    }

    /// Step to the previous position in play order, wrapping from the first
    /// entry to the last. From the drained state this lands on the last entry.
    pub fn step_back(&mut self) -> Advance {
        let len = self.order.len();
        if len == 0 {
            return Advance::Drained;
        }
        let pos = match self.cursor {
            Some(pos) => (pos + len - 1) % len,
            None => len - 1,
        };
        if self.mode == PlayMode::Shuffle {
            self.played.insert(self.order[pos]);
        }
        self.place(pos)
    }

    /// Switch policy. Entering shuffle reshuffles the order and starts a new
    /// pass in which the current track counts as already played.
    pub fn set_mode(&mut self, mode: PlayMode) {
        if mode == self.mode {
            return;
        }
        if mode == PlayMode::Shuffle {
            let current = self.current();
            self.order.shuffle(&mut self.rng);
            self.played.clear();
            if let Some(track) = current {
                self.cursor = self.order.iter().position(|&i| i == track);
                self.played.insert(track);
            }
        }
        self.mode = mode;
    }

    fn place(&mut self, pos: usize) -> Advance {
        if pos >= self.order.len() {
            self.cursor = None;
            return Advance::Drained;
        }
        self.cursor = Some(pos);
        Advance::Open(self.order[pos])
    }

    fn advance_sequential(&mut self) -> Advance {
        let next = self.cursor.map_or(0, |pos| pos + 1);
        if next >= self.order.len() {
            if self.repeat {
                return self.place(0);
            }
            self.cursor = None;
            return Advance::Drained;
        }
        self.place(next)
    }

    fn advance_shuffle(&mut self) -> Advance {
        let len = self.order.len();
        if len == 0 {
            self.cursor = None;
            return Advance::Drained;
        }
        if self.played.len() >= len {
            self.played.clear();
            if !self.repeat {
                self.cursor = None;
                return Advance::Drained;
            }
            self.order.shuffle(&mut self.rng);
        }

        let available: Vec<usize> = (0..len)
            .filter(|&pos| !self.played.contains(&self.order[pos]))
            .collect();
        let Some(&pos) = available.choose(&mut self.rng) else {
            self.cursor = None;
            return Advance::Drained;
        };
        self.played.insert(self.order[pos]);
        self.place(pos)
    }
}
