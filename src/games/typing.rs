use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::score::{BestScores, Metric};
use crate::session::Phase;

pub const GAME_KEY: &str = "typingTest";

/// Rounds finishing faster than this are timed as if they took this long,
/// which keeps words-per-minute finite.
pub const MIN_ELAPSED_MS: u64 = 1000;

pub const SNIPPETS: [&str; 10] = [
    "const developer = { skills: ['React', 'TypeScript', 'Node.js'], passion: 'coding' };",
    "function fibonacci(n) { return n <= 1 ? n : fibonacci(n-1) + fibonacci(n-2); }",
    "import { useState, useEffect } from 'react'; // React hooks are awesome!",
    "const sortArray = (arr) => arr.sort((a, b) => a - b); // Simple but effective",
    "class Component extends React.Component { render() { return <div>Hello World</div>; } }",
    "async function fetchData() { const response = await fetch(url); return response.json(); }",
    "const filterUsers = users.filter(user => user.active && user.role === 'admin');",
    "let [count, setCount] = useState(0); // State management in React hooks",
    "export default function App() { return <h1>Welcome to my portfolio!</h1>; }",
    "const multiply = (a, b) => a * b; // Arrow functions are concise and elegant",
];

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Correct,
    Incorrect,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingSnapshot {
    pub phase: Phase,
    pub reference: String,
    pub typed: String,
    pub outcomes: Vec<Outcome>,
    pub accuracy: u32,
    pub wpm: u32,
    pub progress: u32,
    pub elapsed_secs: u64,
    pub best_wpm: Option<i64>,
    pub new_record: bool,
}

/// Share of typed characters that match the reference at the same index.
///
/// Each position is compared on its own, so an early typo does not taint the
/// characters after it. Empty input is 100%.
pub fn accuracy(reference: &str, typed: &str) -> u32 {
    let typed_len = typed.chars().count();
    if typed_len == 0 {
        return 100;
    }
    let correct = typed
        .chars()
        .zip(reference.chars())
        .filter(|(t, r)| t == r)
        .count();
    ((correct as f64 / typed_len as f64) * 100.0).round() as u32
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words per minute over `elapsed_ms`, floored at [`MIN_ELAPSED_MS`].
pub fn words_per_minute(text: &str, elapsed_ms: u64) -> u32 {
    let minutes = elapsed_ms.max(MIN_ELAPSED_MS) as f64 / 60_000.0;
    (word_count(text) as f64 / minutes).round() as u32
}

pub fn rating(wpm: u32, accuracy: u32) -> &'static str {
    match (wpm, accuracy) {
        (w, a) if w >= 80 && a >= 95 => "Lightning Fast!",
        (w, a) if w >= 60 && a >= 90 => "Great Job!",
        (w, a) if w >= 40 && a >= 85 => "Good Work!",
        _ => "Keep Practicing!",
    }
}

/// represents a typing round against a reference snippet
#[derive(Debug)]
pub struct TypingTest {
    rng: StdRng,
    reference: String,
    typed: String,
    clock_ms: u64,
    started_at_ms: Option<u64>,
    finished_at_ms: Option<u64>,
    phase: Phase,
    wpm: u32,
    best: BestScores,
    new_record: bool,
}

impl TypingTest {
    pub fn new(best: BestScores) -> Self {
        Self::build(best, StdRng::from_entropy())
    }

    pub fn with_seed(best: BestScores, seed: u64) -> Self {
        Self::build(best, StdRng::seed_from_u64(seed))
    }

    /// A round against a caller-supplied reference text.
    pub fn with_reference(best: BestScores, reference: &str) -> Self {
        let mut test = Self::build(best, StdRng::seed_from_u64(0));
        test.reference = reference.to_string();
        test
    }

    fn build(best: BestScores, rng: StdRng) -> Self {
        let mut test = Self {
            rng,
            reference: String::new(),
            typed: String::new(),
            clock_ms: 0,
            started_at_ms: None,
            finished_at_ms: None,
            phase: Phase::Idle,
            wpm: 0,
            best,
            new_record: false,
        };
        test.new_round();
        test
    }

    /// Picks a snippet and clears the round.
    pub fn new_round(&mut self) {
        self.reference = SNIPPETS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(SNIPPETS[0])
            .to_string();
        self.typed.clear();
        self.started_at_ms = None;
        self.finished_at_ms = None;
        self.phase = Phase::Idle;
        self.wpm = 0;
        self.new_record = false;
        debug!(len = self.reference.len(), "typing round ready");
    }

    /// Replaces the typed text with `text`, truncated to the reference length.
    pub fn on_input(&mut self, text: &str) {
        if self.phase == Phase::Finished {
            trace!("input after finish ignored");
            return;
        }
        let limit = self.reference.chars().count();
        self.typed = text.chars().take(limit).collect();

        if self.phase == Phase::Idle && !self.typed.is_empty() {
            self.phase = Phase::Running;
            self.started_at_ms = Some(self.clock_ms);
            info!("typing round started");
        }

        if self.phase == Phase::Running && self.typed == self.reference {
            self.finish();
        }
    }

    /// Appends one character, for hosts that feed keystrokes.
    pub fn write(&mut self, c: char) {
        let mut text = self.typed.clone();
        text.push(c);
        self.on_input(&text);
    }

    pub fn backspace(&mut self) {
        let mut text = self.typed.clone();
        text.pop();
        self.on_input(&text);
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.clock_ms = self.clock_ms.saturating_add(elapsed.as_millis() as u64);
    }

    fn finish(&mut self) {
        let started = self.started_at_ms.unwrap_or(self.clock_ms);
        let elapsed_ms = self.clock_ms.saturating_sub(started);
        self.phase = Phase::Finished;
        self.finished_at_ms = Some(self.clock_ms);
        self.wpm = words_per_minute(&self.reference, elapsed_ms);
        self.new_record = self.best.offer(GAME_KEY, Metric::Score, self.wpm as i64);
        info!(
            wpm = self.wpm,
            elapsed_ms,
            new_record = self.new_record,
            "typing round finished"
        );
    }

    pub fn accuracy(&self) -> u32 {
        accuracy(&self.reference, &self.typed)
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn has_started(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Whole seconds since the first keystroke, frozen at finish.
    pub fn elapsed_secs(&self) -> u64 {
        match self.started_at_ms {
            Some(start) => self.finished_at_ms.unwrap_or(self.clock_ms).saturating_sub(start) / 1000,
            None => 0,
        }
    }

    pub fn progress(&self) -> u32 {
        let total = self.reference.chars().count();
        if total == 0 {
            return 0;
        }
        ((self.typed.chars().count() as f64 / total as f64) * 100.0).round() as u32
    }

    /// Per-character state of the reference text.
    pub fn outcomes(&self) -> Vec<Outcome> {
        let mut typed = self.typed.chars();
        self.reference
            .chars()
            .map(|expected| match typed.next() {
                Some(c) if c == expected => Outcome::Correct,
                Some(_) => Outcome::Incorrect,
                None => Outcome::Pending,
            })
            .collect()
    }

    pub fn best_wpm(&self) -> Option<i64> {
        self.best.get(GAME_KEY, Metric::Score)
    }

    pub fn snapshot(&self) -> TypingSnapshot {
        TypingSnapshot {
            phase: self.phase,
            reference: self.reference.clone(),
            typed: self.typed.clone(),
            outcomes: self.outcomes(),
            accuracy: self.accuracy(),
            wpm: self.wpm,
            progress: self.progress(),
            elapsed_secs: self.elapsed_secs(),
            best_wpm: self.best_wpm(),
            new_record: self.new_record,
        }
    }
}
