use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::score::{BestScores, Metric};
use crate::session::Epoch;
use crate::timer::{Timer, TimerQueue};

pub const GAME_KEY: &str = "memoryGame";
pub const MATCH_DELAY_MS: u64 = 500;
pub const MISMATCH_DELAY_MS: u64 = 1000;

const CLOCK_MS: u64 = 1000;

/// (symbol, name) per pair; pair ids are 1-based positions in this table.
pub const SYMBOLS: [(&str, &str); 8] = [
    ("⚛", "React"),
    ("📘", "TypeScript"),
    ("🟢", "Node.js"),
    ("🎨", "CSS"),
    ("⚡", "Vite"),
    ("🔥", "Firebase"),
    ("🐍", "Python"),
    ("☕", "Java"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MatchPhase {
    #[default]
    Idle,
    Running,
    Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub pair_id: u32,
    pub instance_id: String,
    pub symbol: &'static str,
    pub name: &'static str,
    pub flipped: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTimer {
    Clock,
    Resolve { first: usize, second: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub phase: MatchPhase,
    pub cards: Vec<Card>,
    pub matched_pairs: u32,
    pub total_pairs: u32,
    pub moves: u32,
    pub elapsed_secs: u32,
    pub best_time: Option<i64>,
    pub best_moves: Option<i64>,
    pub new_best_time: bool,
    pub new_best_moves: bool,
}

pub fn rating(moves: u32) -> &'static str {
    match moves {
        m if m <= 12 => "Genius Memory!",
        m if m <= 16 => "Excellent!",
        m if m <= 20 => "Great Job!",
        _ => "Good Effort!",
    }
}

/// `m:ss`
pub fn format_time(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Memory card game: flip two cards at a time and find every pair.
#[derive(Debug)]
pub struct MemoryGame {
    rng: StdRng,
    pairs: usize,
    timers: TimerQueue<MemoryTimer>,
    epoch: Epoch,
    cards: Vec<Card>,
    // Indices of face-up cards awaiting resolution.
    pending: Vec<usize>,
    phase: MatchPhase,
    matched_pairs: u32,
    moves: u32,
    elapsed_secs: u32,
    best: BestScores,
    new_best_time: bool,
    new_best_moves: bool,
}

impl MemoryGame {
    pub fn new(best: BestScores) -> Self {
        Self::build(best, SYMBOLS.len(), StdRng::from_entropy())
    }

    pub fn with_seed(best: BestScores, seed: u64) -> Self {
        Self::build(best, SYMBOLS.len(), StdRng::seed_from_u64(seed))
    }

    /// Smaller board using the first `pairs` symbols (clamped to 1..=8).
    pub fn with_pairs(best: BestScores, pairs: usize, seed: u64) -> Self {
        Self::build(best, pairs, StdRng::seed_from_u64(seed))
    }

    fn build(best: BestScores, pairs: usize, rng: StdRng) -> Self {
        let mut game = Self {
            rng,
            pairs: pairs.clamp(1, SYMBOLS.len()),
            timers: TimerQueue::new(),
            epoch: Epoch::new(),
            cards: vec![],
            pending: vec![],
            phase: MatchPhase::Idle,
            matched_pairs: 0,
            moves: 0,
            elapsed_secs: 0,
            best,
            new_best_time: false,
            new_best_moves: false,
        };
        game.new_game();
        game
    }

    /// Deals a freshly shuffled deck and waits for the first flip.
    pub fn new_game(&mut self) {
        self.epoch = self.epoch.next();
        self.timers.clear();
        self.cards = SYMBOLS
            .iter()
            .take(self.pairs)
            .enumerate()
            .flat_map(|(idx, &(symbol, name))| {
                let pair_id = idx as u32 + 1;
                ["a", "b"].map(|half| Card {
                    pair_id,
                    instance_id: format!("{pair_id}-{half}"),
                    symbol,
                    name,
                    flipped: false,
                    matched: false,
                })
            })
            .collect();
        self.cards.shuffle(&mut self.rng);
        self.pending.clear();
        self.phase = MatchPhase::Idle;
        self.matched_pairs = 0;
        self.moves = 0;
        self.elapsed_secs = 0;
        self.new_best_time = false;
        self.new_best_moves = false;
        debug!(epoch = self.epoch.value(), pairs = self.pairs, "memory deck dealt");
    }

    /// Turns a card face up. Ignored for matched or face-up cards, while two cards
    /// await resolution, and after the game is won.
    pub fn flip(&mut self, instance_id: &str) {
        if self.phase == MatchPhase::Won || self.pending.len() >= 2 {
            trace!(instance_id, "flip rejected");
            return;
        }
        let Some(idx) = self.cards.iter().position(|c| c.instance_id == instance_id) else {
            trace!(instance_id, "flip of unknown card");
            return;
        };
        if self.cards[idx].matched || self.cards[idx].flipped {
            return;
        }

        if self.phase == MatchPhase::Idle {
            self.phase = MatchPhase::Running;
            self.timers.schedule(CLOCK_MS, self.epoch, MemoryTimer::Clock);
            info!("memory game started");
        }

        self.cards[idx].flipped = true;
        self.pending.push(idx);

        if let [first, second] = self.pending[..] {
            self.moves += 1;
            let delay = if self.cards[first].pair_id == self.cards[second].pair_id {
                MATCH_DELAY_MS
            } else {
                MISMATCH_DELAY_MS
            };
            self.timers
                .schedule(delay, self.epoch, MemoryTimer::Resolve { first, second });
        }
    }

    /// Convenience for hosts that address cards by board position.
    pub fn flip_at(&mut self, position: usize) {
        if let Some(id) = self.cards.get(position).map(|c| c.instance_id.clone()) {
            self.flip(&id);
        }
    }

    /// One second of play time.
    pub fn tick(&mut self) {
        if self.phase == MatchPhase::Running {
            self.elapsed_secs += 1;
        }
    }

    pub fn advance(&mut self, elapsed: Duration) {
        let until = self.timers.target(elapsed);
        while let Some(timer) = self.timers.pop_due(until) {
            self.handle_timer(timer);
        }
        self.timers.settle(until);
    }

    pub fn handle_timer(&mut self, timer: Timer<MemoryTimer>) {
        if timer.epoch != self.epoch {
            trace!(stale = timer.epoch.value(), "ignoring stale timer");
            return;
        }
        match timer.event {
            MemoryTimer::Clock => {
                self.tick();
                if self.phase == MatchPhase::Running {
                    self.timers.schedule(CLOCK_MS, self.epoch, MemoryTimer::Clock);
                }
            }
            MemoryTimer::Resolve { first, second } => self.resolve(first, second),
        }
    }

    fn resolve(&mut self, first: usize, second: usize) {
        if self.pending[..] != [first, second] {
            trace!("resolution for cards no longer pending");
            return;
        }
        self.pending.clear();

        if self.cards[first].pair_id == self.cards[second].pair_id {
            self.cards[first].matched = true;
            self.cards[second].matched = true;
            self.matched_pairs += 1;
            debug!(pair_id = self.cards[first].pair_id, "pair matched");
            if self.matched_pairs as usize == self.pairs {
                self.win();
            }
        } else {
            self.cards[first].flipped = false;
            self.cards[second].flipped = false;
        }
    }

    fn win(&mut self) {
        self.phase = MatchPhase::Won;
        self.timers.clear();
        self.new_best_time = self
            .best
            .offer(GAME_KEY, Metric::Time, self.elapsed_secs as i64);
        self.new_best_moves = self.best.offer(GAME_KEY, Metric::Moves, self.moves as i64);
        info!(
            moves = self.moves,
            secs = self.elapsed_secs,
            "memory game won"
        );
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, instance_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.instance_id == instance_id)
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn matched_pairs(&self) -> u32 {
        self.matched_pairs
    }

    pub fn total_pairs(&self) -> u32 {
        self.pairs as u32
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Cards currently face up without being matched.
    pub fn face_up_unmatched(&self) -> usize {
        self.cards.iter().filter(|c| c.flipped && !c.matched).count()
    }

    pub fn pending_timers(&self) -> Vec<Timer<MemoryTimer>> {
        self.timers.pending().into_iter().cloned().collect()
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            phase: self.phase,
            cards: self.cards.clone(),
            matched_pairs: self.matched_pairs,
            total_pairs: self.total_pairs(),
            moves: self.moves,
            elapsed_secs: self.elapsed_secs,
            best_time: self.best.get(GAME_KEY, Metric::Time),
            best_moves: self.best.get(GAME_KEY, Metric::Moves),
            new_best_time: self.new_best_time,
            new_best_moves: self.new_best_moves,
        }
    }
}
