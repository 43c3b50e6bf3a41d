// Library surface for the game engines, shared by the binary and integration tests.
// Rendering lives in the binary; nothing here draws to the terminal.
pub mod app_dirs;
pub mod config;
pub mod games;
pub mod runtime;
pub mod score;
pub mod session;
pub mod timer;

pub use games::bug_smasher::BugSmasher;
pub use games::memory::MemoryGame;
pub use games::typing::TypingTest;
pub use games::GameKind;
pub use score::{BestScores, Metric};
