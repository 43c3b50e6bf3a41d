use ratatui::Frame;

use crate::{
    ui::{render_bug_smasher, render_memory, render_menu, render_typing},
    App, AppState,
};
use arcade::GameKind;

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

pub struct MenuScreen;

impl Screen for MenuScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_menu(app, f);
    }
}

pub struct BugSmasherScreen;

impl Screen for BugSmasherScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_bug_smasher(app, f);
    }
}

pub struct MemoryScreen;

impl Screen for MemoryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_memory(app, f);
    }
}

pub struct TypingScreen;

impl Screen for TypingScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_typing(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Menu => Box::new(MenuScreen),
        AppState::Playing(GameKind::BugSmasher) => Box::new(BugSmasherScreen),
        AppState::Playing(GameKind::Memory) => Box::new(MemoryScreen),
        AppState::Playing(GameKind::Typing) => Box::new(TypingScreen),
    }
}
