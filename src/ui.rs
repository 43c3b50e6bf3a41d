pub mod screen;

use arcade::{
    games::{bug_smasher, memory, typing, GameKind},
    session::Phase,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{App, MEMORY_COLUMNS};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const CELL_WIDTH: usize = 6;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn accent() -> Style {
    bold().fg(Color::LightGreen)
}

/// Centers `text` in `width` terminal columns, accounting for wide glyphs.
fn center_cell(text: &str, width: usize) -> String {
    let w = text.width();
    if w >= width {
        return text.to_string();
    }
    let left = (width - w) / 2;
    let right = width - w - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

fn layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // title + stats
            Constraint::Min(0),    // board
            Constraint::Length(2), // help
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

fn help(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(text, dim().add_modifier(Modifier::ITALIC)))
        .alignment(Alignment::Center)
}

fn best_line(label: &str, value: Option<String>, new_record: bool) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{label}: "), dim()),
        Span::styled(value.unwrap_or_else(|| "-".to_string()), accent()),
    ];
    if new_record {
        spans.push(Span::styled("  New Record!", bold().fg(Color::Yellow)));
    }
    Line::from(spans)
}

pub fn render_menu(app: &App, f: &mut Frame) {
    let [header, body, footer] = layout(f.area());

    f.render_widget(
        Paragraph::new(Span::styled("ARCADE", accent()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM)),
        header,
    );

    let lines: Vec<Line> = GameKind::ALL
        .iter()
        .enumerate()
        .flat_map(|(idx, kind)| {
            let d = kind.descriptor();
            let selected = idx == app.menu_index;
            let marker = if selected { "> " } else { "  " };
            let name_style = if selected { accent() } else { bold() };
            [
                Line::from(vec![
                    Span::styled(format!("{marker}{}. {}", idx + 1, d.name), name_style),
                ]),
                Line::from(Span::styled(format!("     {}", d.description), dim())),
                Line::from(""),
            ]
        })
        .collect();
    f.render_widget(Paragraph::new(lines), body);
    f.render_widget(help("↑/↓ select · enter/1-3 play · esc quit"), footer);
}

pub fn render_bug_smasher(app: &App, f: &mut Frame) {
    let game = &app.bug_smasher;
    let [header, body, footer] = layout(f.area());

    let stats = Line::from(vec![
        Span::styled(format!("Score {}  ", game.score()), accent()),
        Span::styled(format!("Time {}s  ", game.seconds_remaining()), bold()),
        Span::styled(
            if game.combo() > 0 {
                format!("Combo {}x  ", game.combo())
            } else {
                "Combo -  ".to_string()
            },
            bold().fg(Color::Magenta),
        ),
        Span::styled(format!("Clicks {}", game.clicks()), dim()),
    ]);
    f.render_widget(
        Paragraph::new(vec![Line::from(Span::styled("Bug Smasher", bold())), stats])
            .alignment(Alignment::Center),
        header,
    );

    let mut lines: Vec<Line> = vec![];
    match game.phase() {
        Phase::Idle => {
            lines.push(Line::from("Hit the bugs before they escape!"));
            lines.push(Line::from("Faster bugs are worth more points."));
        }
        Phase::Running => {
            if game.combo() > 2 {
                lines.push(Line::from(Span::styled(
                    format!(
                        "COMBO x{}! +{} bonus per hit",
                        game.combo(),
                        game.combo() * bug_smasher::COMBO_BONUS_PER_HIT
                    ),
                    accent(),
                )));
            }
            lines.push(Line::from(""));
            const KEYS: [&str; 9] = ["7", "8", "9", "4", "5", "6", "1", "2", "3"];
            for row in 0..3 {
                let cells: Vec<Span> = (0..3)
                    .map(|col| {
                        let slot = row * 3 + col;
                        match game.target_at(slot) {
                            Some(t) => Span::styled(
                                format!("[{}]", center_cell(t.kind.symbol(), CELL_WIDTH)),
                                bold().fg(Color::Red),
                            ),
                            None => Span::styled(
                                format!("[{}]", center_cell(KEYS[slot], CELL_WIDTH)),
                                dim(),
                            ),
                        }
                    })
                    .collect();
                lines.push(Line::from(cells));
                lines.push(Line::from(""));
            }
        }
        Phase::Finished => {
            let snap = game.snapshot();
            lines.push(Line::from(Span::styled("Game Over!", accent())));
            lines.push(Line::from(format!(
                "Score {} · Max combo {}x · Clicks {} · Hit rate {}%",
                snap.score, snap.max_combo, snap.clicks, snap.hit_rate
            )));
            lines.push(Line::from(bug_smasher::rating(snap.score)));
            lines.push(best_line(
                "High score",
                snap.high_score.map(|v| v.to_string()),
                snap.new_record,
            ));
        }
    }
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        body,
    );
    f.render_widget(help("numpad 1-9 smash · space start · esc menu"), footer);
}

pub fn render_memory(app: &App, f: &mut Frame) {
    let game = &app.memory;
    let snap = game.snapshot();
    let [header, body, footer] = layout(f.area());

    let stats = Line::from(vec![
        Span::styled(format!("Time {}  ", memory::format_time(snap.elapsed_secs)), bold()),
        Span::styled(format!("Moves {}  ", snap.moves), bold().fg(Color::Magenta)),
        Span::styled(
            format!("Pairs {}/{}", snap.matched_pairs, snap.total_pairs),
            accent(),
        ),
    ]);
    f.render_widget(
        Paragraph::new(vec![Line::from(Span::styled("Memory Game", bold())), stats])
            .alignment(Alignment::Center),
        header,
    );

    let mut lines: Vec<Line> = vec![Line::from("")];
    for (row, chunk) in snap.cards.chunks(MEMORY_COLUMNS).enumerate() {
        let cells: Vec<Span> = chunk
            .iter()
            .enumerate()
            .map(|(col, card)| {
                let idx = row * MEMORY_COLUMNS + col;
                let face = if card.flipped || card.matched {
                    card.symbol
                } else {
                    "?"
                };
                let mut style = if card.matched {
                    accent()
                } else if card.flipped {
                    bold().fg(Color::Cyan)
                } else {
                    dim()
                };
                if idx == app.memory_cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Span::styled(format!("[{}]", center_cell(face, CELL_WIDTH)), style)
            })
            .collect();
        lines.push(Line::from(cells));
        lines.push(Line::from(""));
    }

    if snap.phase == memory::MatchPhase::Won {
        lines.push(Line::from(Span::styled("You Won!", accent())));
        lines.push(Line::from(memory::rating(snap.moves)));
        lines.push(best_line(
            "Best time",
            snap.best_time.map(|t| memory::format_time(t as u32)),
            snap.new_best_time,
        ));
        lines.push(best_line(
            "Best moves",
            snap.best_moves.map(|m| m.to_string()),
            snap.new_best_moves,
        ));
    }

    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        body,
    );
    f.render_widget(help("arrows move · space flip · n new game · esc menu"), footer);
}

pub fn render_typing(app: &App, f: &mut Frame) {
    let game = &app.typing;
    let snap = game.snapshot();
    let [header, body, footer] = layout(f.area());

    let stats = Line::from(vec![
        Span::styled(format!("WPM {}  ", snap.wpm), accent()),
        Span::styled(format!("Accuracy {}%  ", snap.accuracy), bold().fg(Color::Magenta)),
        Span::styled(format!("Time {}s  ", snap.elapsed_secs), bold()),
        Span::styled(format!("Progress {}%", snap.progress), dim()),
    ]);
    f.render_widget(
        Paragraph::new(vec![Line::from(Span::styled("Typing Test", bold())), stats])
            .alignment(Alignment::Center),
        header,
    );

    let green = bold().fg(Color::Green);
    let red = bold().fg(Color::Red);
    let typed: Vec<char> = snap.typed.chars().collect();
    let prompt: Vec<Span> = snap
        .reference
        .chars()
        .zip(snap.outcomes.iter())
        .enumerate()
        .map(|(idx, (expected, outcome))| match outcome {
            typing::Outcome::Correct => Span::styled(expected.to_string(), green),
            typing::Outcome::Incorrect => Span::styled(
                match typed.get(idx) {
                    Some(' ') | None => "·".to_string(),
                    Some(c) => c.to_string(),
                },
                red,
            ),
            typing::Outcome::Pending if idx == typed.len() => Span::styled(
                expected.to_string(),
                dim().add_modifier(Modifier::UNDERLINED),
            ),
            typing::Outcome::Pending => Span::styled(expected.to_string(), dim()),
        })
        .collect();

    let mut lines = vec![Line::from(""), Line::from(prompt), Line::from("")];
    match snap.phase {
        Phase::Idle => lines.push(Line::from(Span::styled(
            "Start typing to begin. Focus on accuracy first, then speed.",
            dim(),
        ))),
        Phase::Running => {}
        Phase::Finished => {
            lines.push(Line::from(Span::styled("Test Complete!", accent())));
            lines.push(Line::from(typing::rating(snap.wpm, snap.accuracy)));
            lines.push(best_line(
                "Best WPM",
                snap.best_wpm.map(|v| v.to_string()),
                snap.new_record,
            ));
        }
    }

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false }),
        body,
    );
    f.render_widget(help("tab new snippet · enter again when done · esc menu"), footer);
}
