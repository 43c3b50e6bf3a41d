mod ui;

use arcade::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, StoreBackend},
    games::{self, bug_smasher, memory::MatchPhase},
    runtime::{ArcadeEvent, CrosstermEventSource, FixedTicker, Runner},
    session::Phase,
    BestScores, BugSmasher, GameKind, MemoryGame, TypingTest,
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 50;

/// Memory board width in cards.
pub const MEMORY_COLUMNS: usize = 4;

/// terminal mini-game arcade with persistent best scores
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal arcade of three small games (typing test, memory match and bug smasher) that keeps your best results between runs."
)]
pub struct Cli {
    /// game to open directly instead of the menu
    #[clap(value_enum)]
    game: Option<GameKind>,

    /// where best scores are stored
    #[clap(short = 'b', long, value_enum)]
    backend: Option<StoreBackend>,

    /// custom path for the score database or json file
    #[clap(long)]
    db: Option<PathBuf>,

    /// seed for shuffles and spawns, for reproducible games
    #[clap(short = 's', long)]
    seed: Option<u64>,

    /// print stored best scores and exit
    #[clap(long)]
    scores: bool,
}

impl Cli {
    /// Overlay the persistent CLI choices on the saved config. `--seed` is left out
    /// so one seeded run does not seed every later one.
    fn apply(&self, config: &mut Config) {
        if let Some(game) = self.game {
            config.default_game = game;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
    }

    /// Seed for this run: the flag, else whatever the config file pins.
    fn seed(&self, config: &Config) -> Option<u64> {
        self.seed.or(config.seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Menu,
    Playing(GameKind),
}

#[derive(Debug, PartialEq)]
enum Control {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub menu_index: usize,
    pub bug_smasher: BugSmasher,
    pub memory: MemoryGame,
    pub memory_cursor: usize,
    pub typing: TypingTest,
    pub scores: BestScores,
}

impl App {
    pub fn new(scores: BestScores, seed: Option<u64>, initial: Option<GameKind>) -> Self {
        let (bug_smasher, memory, typing) = match seed {
            Some(seed) => (
                BugSmasher::with_seed(scores.clone(), seed),
                MemoryGame::with_seed(scores.clone(), seed),
                TypingTest::with_seed(scores.clone(), seed),
            ),
            None => (
                BugSmasher::new(scores.clone()),
                MemoryGame::new(scores.clone()),
                TypingTest::new(scores.clone()),
            ),
        };
        let mut app = Self {
            state: initial.map_or(AppState::Menu, AppState::Playing),
            menu_index: 0,
            bug_smasher,
            memory,
            memory_cursor: 0,
            typing,
            scores,
        };
        if let Some(game) = initial {
            app.highlight(game);
        }
        app
    }

    /// Feeds wall time into the game on screen. Games in the background stay paused.
    pub fn advance(&mut self, elapsed: Duration) {
        match self.state {
            AppState::Menu => {}
            AppState::Playing(GameKind::BugSmasher) => self.bug_smasher.advance(elapsed),
            AppState::Playing(GameKind::Memory) => self.memory.advance(elapsed),
            AppState::Playing(GameKind::Typing) => self.typing.advance(elapsed),
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        match self.state {
            AppState::Menu => return self.on_menu_key(key),
            AppState::Playing(_) if key.code == KeyCode::Esc => {
                self.state = AppState::Menu;
            }
            AppState::Playing(GameKind::BugSmasher) => self.on_bug_smasher_key(key),
            AppState::Playing(GameKind::Memory) => self.on_memory_key(key),
            AppState::Playing(GameKind::Typing) => self.on_typing_key(key),
        }
        Control::Continue
    }

    fn on_menu_key(&mut self, key: KeyEvent) -> Control {
        let count = GameKind::ALL.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            KeyCode::Up => self.menu_index = (self.menu_index + count - 1) % count,
            KeyCode::Down => self.menu_index = (self.menu_index + 1) % count,
            KeyCode::Enter => self.open(GameKind::ALL[self.menu_index]),
            KeyCode::Char(c @ '1'..='3') => {
                self.menu_index = (c as usize) - ('1' as usize);
                self.open(GameKind::ALL[self.menu_index]);
            }
            _ => {}
        }
        Control::Continue
    }

    /// Moves the menu selection to `game`.
    pub fn highlight(&mut self, game: GameKind) {
        if let Some(idx) = GameKind::ALL.iter().position(|k| *k == game) {
            self.menu_index = idx;
        }
    }

    fn open(&mut self, game: GameKind) {
        info!(%game, "opening game");
        self.state = AppState::Playing(game);
        self.highlight(game);
    }

    fn on_bug_smasher_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => self.bug_smasher.start(),
            KeyCode::Char(c) => {
                let Some(slot) = slot_for_key(c) else {
                    return;
                };
                match self.bug_smasher.target_at(slot).map(|t| t.id) {
                    Some(id) => self.bug_smasher.hit(id),
                    None => self.bug_smasher.miss(),
                }
            }
            _ => {}
        }
    }

    fn on_memory_key(&mut self, key: KeyEvent) {
        let total = self.memory.cards().len();
        if total == 0 {
            return;
        }
        match key.code {
            KeyCode::Left => self.memory_cursor = self.memory_cursor.saturating_sub(1),
            KeyCode::Right => self.memory_cursor = (self.memory_cursor + 1).min(total - 1),
            KeyCode::Up => {
                self.memory_cursor = self.memory_cursor.saturating_sub(MEMORY_COLUMNS)
            }
            KeyCode::Down => {
                if self.memory_cursor + MEMORY_COLUMNS < total {
                    self.memory_cursor += MEMORY_COLUMNS;
                }
            }
            KeyCode::Char('n') => {
                self.memory.new_game();
                self.memory_cursor = 0;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.memory.phase() == MatchPhase::Won {
                    self.memory.new_game();
                    self.memory_cursor = 0;
                } else {
                    self.memory.flip_at(self.memory_cursor);
                }
            }
            _ => {}
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => self.typing.new_round(),
            KeyCode::Enter if self.typing.phase() == Phase::Finished => self.typing.new_round(),
            KeyCode::Backspace => self.typing.backspace(),
            KeyCode::Char(c) => self.typing.write(c),
            _ => {}
        }
    }
}

/// Number keys laid out like a numpad: 7 8 9 is the top row of the grid.
pub fn slot_for_key(c: char) -> Option<usize> {
    let slot = match c {
        '7' => 0,
        '8' => 1,
        '9' => 2,
        '4' => 3,
        '5' => 4,
        '6' => 5,
        '1' => 6,
        '2' => 7,
        '3' => 8,
        _ => return None,
    };
    (slot < bug_smasher::GRID_SIZE).then_some(slot)
}

fn init_tracing() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("ARCADE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn format_scores(scores: &BestScores) -> String {
    let records = scores.records(&games::score_keys());
    if records.is_empty() {
        return "no best scores recorded yet".to_string();
    }
    records
        .iter()
        .map(|r| format!("{:<12} {:<6} {}", r.game_key, r.metric.to_string(), r.value))
        .join("\n")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);
    if let Err(e) = config_store.save(&config) {
        warn!(error = %e, "could not save config");
    }

    let scores = config.backend.open(cli.db.as_deref());

    if cli.scores {
        println!("{}", format_scores(&scores));
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(scores, cli.seed(&config), cli.game);
    if cli.game.is_none() {
        app.highlight(config.default_game);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let step = runner.step();
        app.advance(step.elapsed);
        match step.event {
            ArcadeEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
            }
            ArcadeEvent::Resize | ArcadeEvent::Tick => {}
        }
    }

    Ok(())
}
