//! Interactive form.
//!
//! Address input, style selectors, the generated post with its character
//! count, the recent posts list and a notice bar.

use crate::notice::{Notice, Severity};
use crate::post::PostRecord;
use crate::prefs::PreferenceStore;
use crate::session::{Session, Status};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tracing::warn;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

const THEME_KEY: &str = "theme";
const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    fn from_pref(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    fn text(self) -> Color {
        match self {
            Theme::Dark => Color::White,
            Theme::Light => Color::Black,
        }
    }

    fn accent(self) -> Color {
        match self {
            Theme::Dark => Color::Cyan,
            Theme::Light => Color::Blue,
        }
    }

    fn muted(self) -> Color {
        match self {
            Theme::Dark => Color::DarkGray,
            Theme::Light => Color::Gray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Address,
    Length,
    Tone,
    Emoji,
    Records,
}

impl Focus {
    fn next(self, with_records: bool) -> Self {
        match self {
            Focus::Address => Focus::Length,
            Focus::Length => Focus::Tone,
            Focus::Tone => Focus::Emoji,
            Focus::Emoji if with_records => Focus::Records,
            Focus::Emoji | Focus::Records => Focus::Address,
        }
    }

    fn prev(self, with_records: bool) -> Self {
        match self {
            Focus::Address if with_records => Focus::Records,
            Focus::Address => Focus::Emoji,
            Focus::Length => Focus::Address,
            Focus::Tone => Focus::Length,
            Focus::Emoji => Focus::Tone,
            Focus::Records => Focus::Emoji,
        }
    }
}

/// What a key press asks for once the form state has been updated.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    Generate,
    Share,
    ShareSelected,
    DeleteSelected,
    Refresh,
    ToggleTheme,
    Quit,
}

struct Form {
    input: Input,
    focus: Focus,
    selected: ListState,
    theme: Theme,
}

impl Form {
    fn handle_key(&mut self, key: KeyEvent, session: &mut Session) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let with_records = session.persists();

        match key.code {
            KeyCode::Char('c') if ctrl => return Action::Quit,
            KeyCode::Char('s') if ctrl => return Action::Share,
            KeyCode::Char('r') if ctrl => return Action::Refresh,
            KeyCode::Char('t') if ctrl => return Action::ToggleTheme,
            KeyCode::Esc => {
                if session.notice().is_some() {
                    session.dismiss_notice();
                    return Action::None;
                }
                return Action::Quit;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next(with_records);
                return Action::None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev(with_records);
                return Action::None;
            }
            KeyCode::Enter if self.focus != Focus::Records => {
                return if session.can_generate() {
                    Action::Generate
                } else {
                    Action::None
                };
            }
            _ => {}
        }

        match self.focus {
            Focus::Address => {
                if self.input.handle_event(&Event::Key(key)).is_some() {
                    session.set_address(self.input.value());
                }
            }
            Focus::Length => match key.code {
                KeyCode::Left => session.options.length = session.options.length.prev(),
                KeyCode::Right | KeyCode::Char(' ') => {
                    session.options.length = session.options.length.next()
                }
                _ => {}
            },
            Focus::Tone => match key.code {
                KeyCode::Left => session.options.tone = session.options.tone.prev(),
                KeyCode::Right | KeyCode::Char(' ') => {
                    session.options.tone = session.options.tone.next()
                }
                _ => {}
            },
            Focus::Emoji => {
                if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                    session.options.emoji = !session.options.emoji;
                }
            }
            Focus::Records => match key.code {
                KeyCode::Up => self.move_selection(session.records().len(), -1),
                KeyCode::Down => self.move_selection(session.records().len(), 1),
                KeyCode::Char('d') | KeyCode::Delete => return Action::DeleteSelected,
                KeyCode::Char('s') | KeyCode::Enter => return Action::ShareSelected,
                _ => {}
            },
        }
        Action::None
    }

    fn move_selection(&mut self, len: usize, delta: isize) {
        if len == 0 {
            self.selected.select(None);
            return;
        }
        let current = self.selected.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.selected.select(Some(next as usize));
    }

    fn selected_record<'a>(&self, session: &'a Session) -> Option<&'a PostRecord> {
        self.selected.selected().and_then(|i| session.records().get(i))
    }

    fn clamp_selection(&mut self, len: usize) {
        match self.selected.selected() {
            _ if len == 0 => self.selected.select(None),
            Some(i) if i >= len => self.selected.select(Some(len - 1)),
            None => self.selected.select(Some(0)),
            _ => {}
        }
    }
}

/// Run the form until the user quits.
pub async fn run_form(session: &mut Session, prefs: &mut dyn PreferenceStore) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_form_loop(&mut terminal, session, prefs).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_form_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut Session,
    prefs: &mut dyn PreferenceStore,
) -> Result<()> {
    let mut form = Form {
        input: Input::default().with_value(session.address.value().to_string()),
        focus: Focus::Address,
        selected: ListState::default(),
        theme: Theme::from_pref(prefs.get(THEME_KEY)),
    };

    session.refresh_records().await;
    form.clamp_selection(session.records().len());

    loop {
        session.expire_notice(Instant::now());
        terminal.draw(|frame| draw_ui(frame, &mut form, &*session))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match form.handle_key(key, session) {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::Generate => {
                session.begin_generating();
                terminal.draw(|frame| draw_ui(frame, &mut form, &*session))?;
                // Outcome is already reflected in the session's status and notice.
                let _ = session.generate().await;
                form.selected.select(Some(0));
            }
            Action::Share => session.share_content().await,
            Action::ShareSelected => {
                if let Some(text) = form.selected_record(session).map(|r| r.content.clone()) {
                    session.share_text(&text).await;
                }
            }
            Action::DeleteSelected => {
                if let Some(id) = form.selected_record(session).map(|r| r.id.clone()) {
                    session.delete_record(&id).await;
                }
            }
            Action::Refresh => {
                session.refresh_records().await;
            }
            Action::ToggleTheme => {
                form.theme = form.theme.toggled();
                if let Err(e) = prefs.set(THEME_KEY, form.theme.as_str()) {
                    warn!(error = %e, "Could not save theme");
                    session.notify(Notice::error(format!("Could not save theme: {e}")));
                }
            }
        }
        form.clamp_selection(session.records().len());
    }
}

fn draw_ui(frame: &mut Frame, form: &mut Form, session: &Session) {
    let theme = form.theme;
    let records_height = if session.persists() { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(records_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_address(frame, form, session, chunks[0]);
    draw_options(frame, form, session, chunks[1]);
    draw_content(frame, theme, session, chunks[2]);
    if session.persists() {
        draw_records(frame, form, session, chunks[3]);
    }
    draw_footer(frame, theme, session, chunks[4]);
}

fn block(title: String, focused: bool, theme: Theme) -> Block<'static> {
    let border = if focused { theme.accent() } else { theme.muted() };
    Block::default()
        .title(title)
        .title_style(Style::default().fg(theme.accent()).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn draw_address(frame: &mut Frame, form: &Form, session: &Session, area: Rect) {
    let theme = form.theme;
    let marker = if session.address.is_valid() { "✓" } else { "✗" };
    let block = block(
        format!(" postgen · address {} ", marker),
        form.focus == Focus::Address,
        theme,
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let cursor = form.input.visual_cursor();
    let scroll = input_scroll(cursor, width);
    let visible: String = form.input.value().chars().skip(scroll).take(width).collect();
    frame.render_widget(
        Paragraph::new(Span::styled(visible, Style::default().fg(theme.text()))),
        inner,
    );

    if form.focus == Focus::Address && width > 0 {
        let offset = cursor.saturating_sub(scroll).min(width - 1) as u16;
        frame.set_cursor_position((inner.x + offset, inner.y));
    }
}

/// First visible character so the cursor stays inside a box `width` wide.
fn input_scroll(cursor: usize, width: usize) -> usize {
    (cursor + 1).saturating_sub(width)
}

fn draw_options(frame: &mut Frame, form: &Form, session: &Session, area: Rect) {
    let theme = form.theme;
    let opts = session.options;
    let styled = |label: String, focus: Focus| {
        let style = if form.focus == focus {
            Style::default().fg(theme.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text())
        };
        Span::styled(label, style)
    };

    let line = Line::from(vec![
        styled(format!("Length ‹ {} ›", opts.length), Focus::Length),
        Span::raw("   "),
        styled(format!("Tone ‹ {} ›", opts.tone), Focus::Tone),
        Span::raw("   "),
        styled(
            format!("Emojis [{}]", if opts.emoji { "x" } else { " " }),
            Focus::Emoji,
        ),
    ]);
    let focused = matches!(form.focus, Focus::Length | Focus::Tone | Focus::Emoji);
    frame.render_widget(
        Paragraph::new(line).block(block(" style ".to_string(), focused, theme)),
        area,
    );
}

fn draw_content(frame: &mut Frame, theme: Theme, session: &Session, area: Rect) {
    let state = match session.status() {
        Status::Idle => String::new(),
        Status::Generating => format!(" · generating with {}…", session.provider()),
        Status::Generated => " · ready".to_string(),
        Status::Failed(_) => " · last attempt failed".to_string(),
    };
    let title = format!(" post ({} chars){} ", session.char_count(), state);
    let body = session
        .content()
        .unwrap_or("Enter a web address and press Enter to generate a post.");
    let style = if session.content().is_some() {
        Style::default().fg(theme.text())
    } else {
        Style::default().fg(theme.muted())
    };
    frame.render_widget(
        Paragraph::new(body)
            .style(style)
            .wrap(Wrap { trim: false })
            .block(block(title, false, theme)),
        area,
    );
}

fn draw_records(frame: &mut Frame, form: &mut Form, session: &Session, area: Rect) {
    let theme = form.theme;
    let items: Vec<ListItem> = session
        .records()
        .iter()
        .map(|r| {
            let preview: String = r.content.lines().next().unwrap_or("").chars().take(60).collect();
            ListItem::new(Line::from(vec![
                Span::styled(
                    r.created_at.format("%Y-%m-%d %H:%M ").to_string(),
                    Style::default().fg(theme.muted()),
                ),
                Span::styled(format!("{} ", r.address), Style::default().fg(theme.accent())),
                Span::styled(preview, Style::default().fg(theme.text())),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block(
            " recent posts (s share · d delete) ".to_string(),
            form.focus == Focus::Records,
            theme,
        ))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut form.selected);
}

fn draw_footer(frame: &mut Frame, theme: Theme, session: &Session, area: Rect) {
    let line = match session.notice() {
        Some(notice) => {
            let color = match notice.severity {
                Severity::Info => theme.accent(),
                Severity::Success => Color::Green,
                Severity::Error => Color::Red,
            };
            Line::from(Span::styled(
                format!(" {} (Esc to dismiss)", notice.message),
                Style::default().fg(color),
            ))
        }
        None => Line::from(Span::styled(
            " Tab move · ←/→ change · Enter generate · ^S share · ^R refresh · ^T theme · Esc quit",
            Style::default().fg(theme.muted()),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{ollama::OllamaBackend, Backend, Generator};
    use crate::share::ClipboardShare;
    use ratatui::backend::TestBackend;

    fn session() -> Session {
        let backend = Backend::Ollama(OllamaBackend::new(
            reqwest::Client::new(),
            "m".to_string(),
            "http://127.0.0.1:9".to_string(),
        ));
        Session::new(
            Generator::new(backend, Duration::from_secs(1)),
            None,
            Box::new(ClipboardShare),
            "",
        )
    }

    fn form(value: &str) -> Form {
        Form {
            input: Input::default().with_value(value.to_string()),
            focus: Focus::Address,
            selected: ListState::default(),
            theme: Theme::Dark,
        }
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_input_scroll_keeps_cursor_visible() {
        assert_eq!(input_scroll(3, 10), 0);
        assert_eq!(input_scroll(10, 10), 1);
        assert_eq!(input_scroll(3, 0), 4);
        assert_eq!(input_scroll(0, 0), 1);
    }

    #[test]
    fn test_draw_survives_tiny_terminals() {
        let mut session = session();
        session.set_address("abc");
        for (width, height) in [(2, 20), (3, 4), (80, 24)] {
            let mut form = form("abc");
            let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
            terminal
                .draw(|frame| draw_ui(frame, &mut form, &session))
                .unwrap();
        }
    }

    #[test]
    fn test_letters_type_into_address() {
        let mut session = session();
        let mut form = form("");
        for c in "srtd".chars() {
            let action = form.handle_key(press(KeyCode::Char(c), KeyModifiers::NONE), &mut session);
            assert_eq!(action, Action::None);
        }
        assert_eq!(form.input.value(), "srtd");
        assert_eq!(session.address.value(), "srtd");
        assert!(!session.address.is_valid());
    }

    #[test]
    fn test_control_shortcuts() {
        let mut session = session();
        let mut form = form("");
        let ctrl = KeyModifiers::CONTROL;
        assert_eq!(form.handle_key(press(KeyCode::Char('s'), ctrl), &mut session), Action::Share);
        assert_eq!(form.handle_key(press(KeyCode::Char('r'), ctrl), &mut session), Action::Refresh);
        assert_eq!(
            form.handle_key(press(KeyCode::Char('t'), ctrl), &mut session),
            Action::ToggleTheme
        );
        assert_eq!(form.handle_key(press(KeyCode::Char('c'), ctrl), &mut session), Action::Quit);
        assert_eq!(form.input.value(), "");
    }

    #[test]
    fn test_enter_generates_only_valid_addresses() {
        let mut session = session();
        let mut form = form("");
        for c in "example.com".chars() {
            form.handle_key(press(KeyCode::Char(c), KeyModifiers::NONE), &mut session);
        }
        let enter = press(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(form.handle_key(enter, &mut session), Action::None);

        session.set_address("https://example.com");
        assert_eq!(form.handle_key(enter, &mut session), Action::Generate);
    }

    #[test]
    fn test_record_keys_need_records_focus() {
        let mut session = session();
        let mut form = form("");
        form.focus = Focus::Records;
        let none = KeyModifiers::NONE;
        assert_eq!(
            form.handle_key(press(KeyCode::Char('d'), none), &mut session),
            Action::DeleteSelected
        );
        assert_eq!(
            form.handle_key(press(KeyCode::Char('s'), none), &mut session),
            Action::ShareSelected
        );
        assert_eq!(
            form.handle_key(press(KeyCode::Enter, none), &mut session),
            Action::ShareSelected
        );
    }

    #[test]
    fn test_focus_skips_records_without_persistence() {
        assert_eq!(Focus::Emoji.next(false), Focus::Address);
        assert_eq!(Focus::Emoji.next(true), Focus::Records);
        assert_eq!(Focus::Address.prev(false), Focus::Emoji);
        assert_eq!(Focus::Address.prev(true), Focus::Records);
    }

    #[test]
    fn test_theme_pref_round_trip() {
        assert_eq!(Theme::from_pref(None), Theme::Dark);
        assert_eq!(Theme::from_pref(Some("light".to_string())), Theme::Light);
        assert_eq!(Theme::Light.toggled().as_str(), "dark");
    }

    #[test]
    fn test_move_selection_clamps() {
        let mut form = Form {
            input: Input::default(),
            focus: Focus::Records,
            selected: ListState::default(),
            theme: Theme::Dark,
        };
        form.move_selection(3, 1);
        assert_eq!(form.selected.selected(), Some(1));
        form.move_selection(3, 5);
        assert_eq!(form.selected.selected(), Some(2));
        form.move_selection(3, -9);
        assert_eq!(form.selected.selected(), Some(0));
        form.clamp_selection(0);
        assert_eq!(form.selected.selected(), None);
    }
}
