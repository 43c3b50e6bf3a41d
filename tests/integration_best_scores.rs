use std::time::Duration;

use arcade::games::{bug_smasher, memory, typing};
use arcade::score::{JsonFileStore, SqliteStore};
use arcade::{BestScores, MemoryGame, Metric, TypingTest};
use tempfile::tempdir;

#[test]
fn best_scores_survive_reopening_sqlite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("scores.db");

    {
        let scores = BestScores::new(SqliteStore::open(&path).unwrap());
        let mut test = TypingTest::with_reference(scores.clone(), "one two three four five");
        test.on_input("one two three four five");
        assert!(test.has_finished());
    }

    let reopened = BestScores::new(SqliteStore::open(&path).unwrap());
    assert!(reopened.get(typing::GAME_KEY, Metric::Score).is_some());
}

#[test]
fn memory_bests_only_improve() {
    let dir = tempdir().unwrap();
    let scores = BestScores::new(JsonFileStore::with_path(dir.path().join("scores.json")));

    let play = |scores: &BestScores, idle_secs: u64| {
        let mut game = MemoryGame::with_pairs(scores.clone(), 1, 9);
        game.flip("1-a");
        game.advance(Duration::from_secs(idle_secs));
        game.flip("1-b");
        game.advance(Duration::from_millis(memory::MATCH_DELAY_MS));
        game.snapshot()
    };

    let fast = play(&scores, 0);
    assert!(fast.new_best_time);
    assert!(fast.new_best_moves);

    let slow = play(&scores, 3);
    assert!(!slow.new_best_time);
    assert!(!slow.new_best_moves);
    assert_eq!(scores.get(memory::GAME_KEY, Metric::Time), Some(fast.elapsed_secs as i64));
}

#[test]
fn unreadable_store_does_not_break_games() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scores.json");
    std::fs::write(&path, b"not json").unwrap();
    let scores = BestScores::new(JsonFileStore::with_path(&path));

    assert_eq!(scores.get(bug_smasher::GAME_KEY, Metric::Score), None);
    let mut test = TypingTest::with_reference(scores, "ok");
    test.on_input("ok");
    assert!(test.has_finished());
}
