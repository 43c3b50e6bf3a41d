use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::score::{BestScores, Metric};
use crate::session::{Epoch, Phase};
use crate::timer::{Timer, TimerQueue};

pub const GAME_KEY: &str = "bugSmasher";
pub const GAME_DURATION_SECS: u32 = 30;
pub const GRID_SIZE: usize = 9;
pub const COMBO_BONUS_PER_HIT: u32 = 5;

pub const SPAWN_INTERVAL_START_MS: u64 = 1000;
pub const SPAWN_INTERVAL_FLOOR_MS: u64 = 400;
pub const SPAWN_RAMP_MS_PER_SEC: u64 = 20;

const COUNTDOWN_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BugKind {
    Caterpillar,
    Ladybug,
    Cricket,
    Spider,
    Mosquito,
}

impl BugKind {
    pub const ALL: [BugKind; 5] = [
        BugKind::Caterpillar,
        BugKind::Ladybug,
        BugKind::Cricket,
        BugKind::Spider,
        BugKind::Mosquito,
    ];

    pub fn points(&self) -> u32 {
        match self {
            BugKind::Caterpillar => 10,
            BugKind::Ladybug => 15,
            BugKind::Cricket => 20,
            BugKind::Spider => 25,
            BugKind::Mosquito => 30,
        }
    }

    /// How long the bug stays on the board before escaping.
    pub fn lifetime_ms(&self) -> u64 {
        match self {
            BugKind::Caterpillar => 1000,
            BugKind::Ladybug => 800,
            BugKind::Cricket => 600,
            BugKind::Spider => 500,
            BugKind::Mosquito => 400,
        }
    }

    pub fn weight(&self) -> u32 {
        1
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BugKind::Caterpillar => "🐛",
            BugKind::Ladybug => "🐞",
            BugKind::Cricket => "🦗",
            BugKind::Spider => "🕷",
            BugKind::Mosquito => "🦟",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: u64,
    pub slot: usize,
    pub kind: BugKind,
    pub visible: bool,
}

impl Target {
    pub fn points(&self) -> u32 {
        self.kind.points()
    }

    pub fn lifetime_ms(&self) -> u64 {
        self.kind.lifetime_ms()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BugTimer {
    Countdown,
    Spawn,
    Expire(u64),
}

/// Render-friendly copy of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugSmasherSnapshot {
    pub phase: Phase,
    pub score: u32,
    pub seconds_remaining: u32,
    pub clicks: u32,
    pub hits: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub hit_rate: u32,
    pub targets: Vec<Target>,
    pub high_score: Option<i64>,
    pub new_record: bool,
}

/// Spawn interval for the given elapsed play time: starts slow, ramps linearly, floors.
pub fn spawn_interval_ms(elapsed_secs: u32) -> u64 {
    SPAWN_INTERVAL_START_MS
        .saturating_sub(elapsed_secs as u64 * SPAWN_RAMP_MS_PER_SEC)
        .max(SPAWN_INTERVAL_FLOOR_MS)
}

pub fn rating(score: u32) -> &'static str {
    match score {
        s if s >= 500 => "Bug Exterminator!",
        s if s >= 350 => "Debug Master!",
        s if s >= 200 => "Bug Hunter!",
        _ => "Keep Practicing!",
    }
}

/// Whack-a-mole style game: bugs pop up on a 3x3 grid and must be hit before they escape.
#[derive(Debug)]
pub struct BugSmasher {
    rng: StdRng,
    timers: TimerQueue<BugTimer>,
    epoch: Epoch,
    targets: Vec<Target>,
    next_id: u64,
    phase: Phase,
    score: u32,
    seconds_remaining: u32,
    clicks: u32,
    hits: u32,
    combo: u32,
    max_combo: u32,
    best: BestScores,
    new_record: bool,
}

impl BugSmasher {
    pub fn new(best: BestScores) -> Self {
        Self::with_rng(best, StdRng::from_entropy())
    }

    pub fn with_seed(best: BestScores, seed: u64) -> Self {
        Self::with_rng(best, StdRng::seed_from_u64(seed))
    }

    fn with_rng(best: BestScores, rng: StdRng) -> Self {
        Self {
            rng,
            timers: TimerQueue::new(),
            epoch: Epoch::new(),
            targets: vec![],
            next_id: 0,
            phase: Phase::Idle,
            score: 0,
            seconds_remaining: GAME_DURATION_SECS,
            clicks: 0,
            hits: 0,
            combo: 0,
            max_combo: 0,
            best,
            new_record: false,
        }
    }

    /// Starts a fresh game; calling it mid-game restarts.
    pub fn start(&mut self) {
        self.epoch = self.epoch.next();
        self.timers.clear();
        self.targets.clear();
        self.next_id = 0;
        self.score = 0;
        self.seconds_remaining = GAME_DURATION_SECS;
        self.clicks = 0;
        self.hits = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.new_record = false;
        self.phase = Phase::Running;

        self.timers
            .schedule(COUNTDOWN_MS, self.epoch, BugTimer::Countdown);
        self.timers
            .schedule(self.current_spawn_interval(), self.epoch, BugTimer::Spawn);
        info!(epoch = self.epoch.value(), "bug smasher started");
    }

    /// One second of countdown.
    pub fn tick(&mut self) {
        if !self.phase.is_running() {
            trace!("tick ignored outside a running game");
            return;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            self.finish();
        }
    }

    /// Spawns a random bug on a random empty slot.
    pub fn spawn(&mut self) -> Option<u64> {
        if !self.phase.is_running() {
            return None;
        }
        let free = self.free_slots();
        if free.is_empty() {
            trace!("board full, skipping spawn");
            return None;
        }
        let slot = free[self.rng.gen_range(0..free.len())];
        let kind = BugKind::ALL
            .choose_weighted(&mut self.rng, |k| k.weight())
            .copied()
            .unwrap_or(BugKind::Caterpillar);
        self.spawn_at(slot, kind)
    }

    /// Spawns `kind` on `slot` if the slot is empty. Returns the new target id.
    pub fn spawn_at(&mut self, slot: usize, kind: BugKind) -> Option<u64> {
        if !self.phase.is_running() || slot >= GRID_SIZE || self.target_at(slot).is_some() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.targets.push(Target {
            id,
            slot,
            kind,
            visible: true,
        });
        self.timers
            .schedule(kind.lifetime_ms(), self.epoch, BugTimer::Expire(id));
        debug!(id, slot, ?kind, "bug spawned");
        Some(id)
    }

    /// Hits target `id`. Unknown or already-removed ids count as a miss.
    pub fn hit(&mut self, id: u64) {
        if !self.phase.is_running() {
            return;
        }
        let Some(pos) = self.targets.iter().position(|t| t.id == id && t.visible) else {
            self.miss();
            return;
        };
        let target = self.targets.remove(pos);
        // Bonus uses the combo as it stood before this hit.
        self.score += target.points() + self.combo * COMBO_BONUS_PER_HIT;
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.clicks += 1;
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        if !self.phase.is_running() {
            return;
        }
        self.clicks += 1;
        self.combo = 0;
    }

    /// Advances virtual time, firing countdown, spawn and expiry timers in order.
    pub fn advance(&mut self, elapsed: Duration) {
        let until = self.timers.target(elapsed);
        while let Some(timer) = self.timers.pop_due(until) {
            self.handle_timer(timer);
        }
        self.timers.settle(until);
    }

    /// Re-enters the engine from a timer. Timers from an earlier session are ignored.
    pub fn handle_timer(&mut self, timer: Timer<BugTimer>) {
        if timer.epoch != self.epoch {
            trace!(
                stale = timer.epoch.value(),
                current = self.epoch.value(),
                "ignoring stale timer"
            );
            return;
        }
        match timer.event {
            BugTimer::Countdown => {
                self.tick();
                if self.phase.is_running() {
                    self.timers
                        .schedule(COUNTDOWN_MS, self.epoch, BugTimer::Countdown);
                }
            }
            BugTimer::Spawn => {
                if self.phase.is_running() {
                    self.spawn();
                    self.timers
                        .schedule(self.current_spawn_interval(), self.epoch, BugTimer::Spawn);
                }
            }
            BugTimer::Expire(id) => self.expire(id),
        }
    }

    fn expire(&mut self, id: u64) {
        if let Some(pos) = self.targets.iter().position(|t| t.id == id) {
            self.targets.remove(pos);
            self.combo = 0;
            debug!(id, "bug escaped");
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.timers.clear();
        self.targets.clear();
        self.new_record = self.best.offer(GAME_KEY, Metric::Score, self.score as i64);
        info!(
            score = self.score,
            max_combo = self.max_combo,
            new_record = self.new_record,
            "bug smasher finished"
        );
    }

    fn current_spawn_interval(&self) -> u64 {
        spawn_interval_ms(GAME_DURATION_SECS - self.seconds_remaining)
    }

    fn free_slots(&self) -> Vec<usize> {
        (0..GRID_SIZE)
            .filter(|slot| self.target_at(*slot).is_none())
            .collect()
    }

    pub fn target_at(&self, slot: usize) -> Option<&Target> {
        self.targets.iter().find(|t| t.slot == slot && t.visible)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn pending_timers(&self) -> Vec<Timer<BugTimer>> {
        self.timers.pending().into_iter().cloned().collect()
    }

    /// Share of clicks that hit a bug, as a rounded percentage.
    pub fn hit_rate(&self) -> u32 {
        if self.clicks == 0 {
            return 0;
        }
        ((self.hits as f64 / self.clicks as f64) * 100.0).round() as u32
    }

    pub fn high_score(&self) -> Option<i64> {
        self.best.get(GAME_KEY, Metric::Score)
    }

    pub fn snapshot(&self) -> BugSmasherSnapshot {
        BugSmasherSnapshot {
            phase: self.phase,
            score: self.score,
            seconds_remaining: self.seconds_remaining,
            clicks: self.clicks,
            hits: self.hits,
            combo: self.combo,
            max_combo: self.max_combo,
            hit_rate: self.hit_rate(),
            targets: self.targets.clone(),
            high_score: self.high_score(),
            new_record: self.new_record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn running() -> BugSmasher {
        let mut game = BugSmasher::with_seed(BestScores::in_memory(), 7);
        game.start();
        game
    }

    #[test]
    fn new_game_is_idle() {
        let game = BugSmasher::with_seed(BestScores::in_memory(), 1);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.seconds_remaining(), GAME_DURATION_SECS);
        assert!(game.targets().is_empty());
    }

    #[test]
    fn actions_before_start_are_noops() {
        let mut game = BugSmasher::with_seed(BestScores::in_memory(), 1);
        game.tick();
        game.miss();
        game.hit(0);
        assert_eq!(game.spawn(), None);
        assert_eq!(game.spawn_at(0, BugKind::Spider), None);
        assert_eq!(game.clicks(), 0);
        assert_eq!(game.seconds_remaining(), GAME_DURATION_SECS);
    }

    #[test]
    fn combo_bonus_uses_pre_hit_combo() {
        let mut game = running();
        let first = game.spawn_at(3, BugKind::Caterpillar).unwrap();
        game.hit(first);
        assert_eq!(game.score(), 10);
        assert_eq!(game.combo(), 1);
        assert_eq!(game.max_combo(), 1);

        let second = game.spawn_at(4, BugKind::Ladybug).unwrap();
        game.hit(second);
        assert_eq!(game.score(), 10 + 15 + COMBO_BONUS_PER_HIT);
        assert_eq!(game.combo(), 2);
        assert_eq!(game.max_combo(), 2);
    }

    #[test]
    fn double_hit_counts_as_miss() {
        let mut game = running();
        let id = game.spawn_at(0, BugKind::Cricket).unwrap();
        game.hit(id);
        assert_eq!(game.score(), 20);
        assert_eq!(game.combo(), 1);

        game.hit(id);
        assert_eq!(game.score(), 20);
        assert_eq!(game.combo(), 0);
        assert_eq!(game.clicks(), 2);
        assert_eq!(game.max_combo(), 1);
    }

    #[test]
    fn miss_resets_combo_keeps_score() {
        let mut game = running();
        let id = game.spawn_at(1, BugKind::Spider).unwrap();
        game.hit(id);
        game.miss();
        assert_eq!(game.score(), 25);
        assert_eq!(game.combo(), 0);
        assert_eq!(game.clicks(), 2);
        assert_eq!(game.hit_rate(), 50);
    }

    #[test]
    fn one_target_per_slot() {
        let mut game = running();
        assert!(game.spawn_at(5, BugKind::Mosquito).is_some());
        assert_eq!(game.spawn_at(5, BugKind::Ladybug), None);
        assert_eq!(game.spawn_at(GRID_SIZE, BugKind::Ladybug), None);
    }

    #[test]
    fn spawn_fills_board_then_noops() {
        let mut game = running();
        for _ in 0..GRID_SIZE {
            assert!(game.spawn().is_some());
        }
        assert_eq!(game.spawn(), None);
        let mut slots: Vec<_> = game.targets().iter().map(|t| t.slot).collect();
        slots.sort();
        assert_eq!(slots, (0..GRID_SIZE).collect::<Vec<_>>());
    }

    #[test]
    fn expiry_removes_target_and_resets_combo() {
        let mut game = running();
        let a = game.spawn_at(0, BugKind::Caterpillar).unwrap();
        game.hit(a);
        assert_eq!(game.combo(), 1);

        let b = game.spawn_at(2, BugKind::Mosquito).unwrap();
        game.advance(Duration::from_millis(399));
        assert!(game.target_at(2).is_some());
        game.advance(Duration::from_millis(1));
        assert!(game.target_at(2).is_none());
        assert_eq!(game.combo(), 0);

        // The escaped bug can no longer be hit.
        game.hit(b);
        assert_eq!(game.score(), 10);
    }

    #[test]
    fn expiry_after_hit_keeps_combo() {
        let mut game = running();
        let id = game.spawn_at(0, BugKind::Mosquito).unwrap();
        game.hit(id);
        game.advance(Duration::from_millis(400));
        assert_eq!(game.combo(), 1);
    }

    #[test]
    fn countdown_finishes_and_records_high_score() {
        let best = BestScores::in_memory();
        let mut game = BugSmasher::with_seed(best.clone(), 3);
        game.start();
        let id = game.spawn_at(4, BugKind::Mosquito).unwrap();
        game.hit(id);

        for _ in 0..GAME_DURATION_SECS - 1 {
            game.tick();
        }
        assert_eq!(game.phase(), Phase::Running);
        game.tick();
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.seconds_remaining(), 0);
        assert!(game.snapshot().new_record);
        assert_eq!(best.get(GAME_KEY, Metric::Score), Some(30));

        // Finished games ignore further input.
        game.miss();
        game.tick();
        assert_eq!(game.clicks(), 1);
    }

    #[test]
    fn lower_score_does_not_replace_high_score() {
        let best = BestScores::in_memory();
        best.offer(GAME_KEY, Metric::Score, 500);
        let mut game = BugSmasher::with_seed(best.clone(), 3);
        game.start();
        for _ in 0..GAME_DURATION_SECS {
            game.tick();
        }
        assert!(!game.snapshot().new_record);
        assert_eq!(game.high_score(), Some(500));
    }

    #[test]
    fn advance_runs_whole_game() {
        let mut game = running();
        game.advance(Duration::from_secs(GAME_DURATION_SECS as u64));
        assert_eq!(game.phase(), Phase::Finished);
        assert!(game.pending_timers().is_empty());
    }

    #[test]
    fn restart_invalidates_old_timers() {
        let mut game = running();
        game.spawn_at(0, BugKind::Caterpillar).unwrap();
        let stale = game.pending_timers();
        assert!(stale
            .iter()
            .any(|t| t.event == BugTimer::Expire(0)));

        game.start();
        let fresh = game.spawn_at(0, BugKind::Caterpillar).unwrap();
        let hit = game.spawn_at(1, BugKind::Caterpillar).unwrap();
        game.hit(hit);
        assert_eq!(fresh, 0);

        for timer in stale {
            game.handle_timer(timer);
        }
        assert!(game.target_at(0).is_some(), "stale expiry must not remove new target");
        assert_eq!(game.combo(), 1);
        assert_eq!(game.seconds_remaining(), GAME_DURATION_SECS);
    }

    #[test]
    fn spawn_cadence_ramps_to_floor() {
        assert_eq!(spawn_interval_ms(0), 1000);
        assert_eq!(spawn_interval_ms(10), 800);
        assert_eq!(spawn_interval_ms(29), 420);
        assert_eq!(spawn_interval_ms(30), 400);
        assert_eq!(spawn_interval_ms(1000), 400);

        let intervals: Vec<_> = (0..=GAME_DURATION_SECS).map(spawn_interval_ms).collect();
        assert!(intervals.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn first_spawn_after_one_interval() {
        let mut game = running();
        game.advance(Duration::from_millis(999));
        assert!(game.targets().is_empty());
        game.advance(Duration::from_millis(1));
        assert_eq!(game.targets().len(), 1);
        assert_eq!(game.seconds_remaining(), GAME_DURATION_SECS - 1);
    }

    #[test]
    fn pending_timers_are_tagged_with_epoch() {
        let game = running();
        let timers = game.pending_timers();
        assert_eq!(timers.len(), 2);
        assert!(timers.iter().all(|t| t.epoch == game.epoch()));
        assert_matches!(timers[0].event, BugTimer::Countdown);
        assert_matches!(timers[1].event, BugTimer::Spawn);
    }

    #[test]
    fn random_play_keeps_invariants() {
        let mut driver = StdRng::seed_from_u64(99);
        let mut game = running();
        let mut last_max = 0;
        for _ in 0..2_000 {
            match driver.gen_range(0..5) {
                0 => {
                    game.spawn();
                }
                1 => {
                    let ids: Vec<_> = game.targets().iter().map(|t| t.id).collect();
                    if let Some(id) = ids.first() {
                        game.hit(*id);
                    } else {
                        game.hit(driver.gen_range(0..50));
                    }
                }
                2 => game.miss(),
                3 => game.advance(Duration::from_millis(driver.gen_range(0..300))),
                _ => game.hit(u64::MAX),
            }
            assert!(game.max_combo() >= last_max);
            assert!(game.max_combo() >= game.combo());
            last_max = game.max_combo();

            let mut slots: Vec<_> = game.targets().iter().map(|t| t.slot).collect();
            slots.sort();
            slots.dedup();
            assert_eq!(slots.len(), game.targets().len());
        }
    }

    #[test]
    fn ratings_follow_thresholds() {
        assert_eq!(rating(500), "Bug Exterminator!");
        assert_eq!(rating(350), "Debug Master!");
        assert_eq!(rating(349), "Bug Hunter!");
        assert_eq!(rating(0), "Keep Practicing!");
    }
}
