use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow, bail};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState,
    },
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dictapad::{
    config::Config,
    dictation::{CommandBackend, DictationController, DictationState, active_locale},
    document::{AttributeKind, Document},
    editor::{NoteEditor, TextPosition},
    render::{CursorVisualPosition, RenderResult, render_document},
    theme::Theme,
    toolbar::{ControlChange, ControlOutcome, SelectionSync, Toolbar, ToolbarState},
};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const USAGE: &str = "Usage: dictapad [--log <path>] [--recognizer <command>] [<file>]";

fn main() -> Result<()> {
    run()
}

fn column_distance(a: u16, b: u16) -> u16 {
    if a >= b { a - b } else { b - a }
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    log: Option<PathBuf>,
    recognizer: Option<String>,
    file: Option<PathBuf>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--log" => {
                let value = args.next().context("--log needs a path")?;
                parsed.log = Some(PathBuf::from(value));
            }
            "--recognizer" => {
                let value = args.next().context("--recognizer needs a command")?;
                parsed.recognizer = Some(value);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path => {
                if parsed.file.is_some() {
                    bail!("only one file can be opened");
                }
                parsed.file = Some(PathBuf::from(path));
            }
        }
    }
    Ok(parsed)
}

fn init_logging(path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter =
        EnvFilter::try_from_env("DICTAPAD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install logger: {err}"))
}

fn run() -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = Config::from_env();
    if let Some(log) = args.log {
        config.log_path = log;
    }
    if let Some(recognizer) = args.recognizer {
        config.recognizer_command = Some(recognizer);
    }
    init_logging(&config.log_path)?;

    let mut app = App::new(config);
    if let Some(path) = args.file {
        app.open_initial(path);
    }

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    if let Err(err) = &res {
        error!("{err:#}");
    }
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    while !app.should_quit() {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt);
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// The toolbar line above the text. Terminal widgets raise no notifications
/// for programmatic updates, so nothing is echoed.
#[derive(Default)]
struct ToolbarLine {
    state: ToolbarState,
}

impl Toolbar for ToolbarLine {
    fn show(&mut self, state: &ToolbarState) -> Vec<ControlChange> {
        self.state = state.clone();
        Vec::new()
    }
}

#[derive(Clone, Copy)]
enum MenuAction {
    New,
    Open,
    Save,
    Exit,
    Toggle(AttributeKind),
    NextFontFamily,
    NextFontSize,
    FontSize,
    Dictation,
}

#[derive(Clone, Copy)]
struct MenuItem {
    label: &'static str,
    action: MenuAction,
    shortcut: char,
}

impl MenuItem {
    const fn new(label: &'static str, action: MenuAction, shortcut: char) -> Self {
        Self {
            label,
            action,
            shortcut,
        }
    }
}

enum MenuEntry {
    Section(&'static str),
    Separator,
    Item(MenuItem),
}

struct MenuState {
    entries: Vec<MenuEntry>,
    selected_index: usize,
}

impl MenuState {
    fn new() -> Self {
        let entries = build_menu_entries();
        let selected_index = entries
            .iter()
            .position(|entry| matches!(entry, MenuEntry::Item(_)))
            .unwrap_or(0);
        Self {
            entries,
            selected_index,
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.entries.is_empty() {
            return;
        }

        let len = self.entries.len() as i32;
        let mut idx = self.selected_index as i32;

        for _ in 0..len {
            idx = (idx + delta).rem_euclid(len);
            if matches!(self.entries[idx as usize], MenuEntry::Item(_)) {
                self.selected_index = idx as usize;
                break;
            }
        }
    }

    fn current_action(&self) -> Option<MenuAction> {
        match self.entries.get(self.selected_index) {
            Some(MenuEntry::Item(item)) => Some(item.action),
            _ => None,
        }
    }

    fn shortcut_action(&mut self, ch: char) -> Option<MenuAction> {
        for (idx, entry) in self.entries.iter().enumerate() {
            if let MenuEntry::Item(item) = entry {
                if item.shortcut == ch {
                    self.selected_index = idx;
                    return Some(item.action);
                }
            }
        }
        None
    }
}

fn build_menu_entries() -> Vec<MenuEntry> {
    vec![
        MenuEntry::Section("File"),
        MenuEntry::Item(MenuItem::new("New", MenuAction::New, 'n')),
        MenuEntry::Item(MenuItem::new("Open...", MenuAction::Open, 'o')),
        MenuEntry::Item(MenuItem::new("Save", MenuAction::Save, 's')),
        MenuEntry::Item(MenuItem::new("Exit", MenuAction::Exit, 'q')),
        MenuEntry::Separator,
        MenuEntry::Section("Format"),
        MenuEntry::Item(MenuItem::new(
            "Bold",
            MenuAction::Toggle(AttributeKind::Bold),
            'b',
        )),
        MenuEntry::Item(MenuItem::new(
            "Italic",
            MenuAction::Toggle(AttributeKind::Italic),
            'i',
        )),
        MenuEntry::Item(MenuItem::new(
            "Underline",
            MenuAction::Toggle(AttributeKind::Underline),
            'u',
        )),
        MenuEntry::Item(MenuItem::new("Next Font", MenuAction::NextFontFamily, 'f')),
        MenuEntry::Item(MenuItem::new("Next Size", MenuAction::NextFontSize, 'z')),
        MenuEntry::Item(MenuItem::new("Font Size...", MenuAction::FontSize, 'g')),
        MenuEntry::Separator,
        MenuEntry::Item(MenuItem::new("Dictation", MenuAction::Dictation, 'd')),
    ]
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Open,
    SaveAs,
    FontSize,
}

impl PromptKind {
    fn label(self) -> &'static str {
        match self {
            PromptKind::Open => "Open file",
            PromptKind::SaveAs => "Save as",
            PromptKind::FontSize => "Font size",
        }
    }
}

struct Prompt {
    kind: PromptKind,
    input: String,
}

struct App {
    config: Config,
    theme: Theme,
    editor: NoteEditor,
    sync: SelectionSync,
    toolbar: ToolbarLine,
    dictation: DictationController<CommandBackend>,
    file_path: Option<PathBuf>,
    scroll_top: usize,
    last_view_height: usize,
    should_quit: bool,
    dirty: bool,
    status_message: Option<(String, Instant)>,
    cursor_map: Vec<(TextPosition, CursorVisualPosition)>,
    last_cursor_visual: Option<CursorVisualPosition>,
    preferred_column: Option<u16>,
    menu: Option<MenuState>,
    prompt: Option<Prompt>,
}

impl App {
    fn new(config: Config) -> Self {
        let editor = NoteEditor::new(Document::with_defaults(config.default_attributes.clone()));
        let backend = CommandBackend::new(
            config.recognizer_command.clone(),
            config.recognizer_locales.clone(),
        );
        let dictation = DictationController::new(backend, active_locale());

        let mut app = Self {
            config,
            theme: Theme::default(),
            editor,
            sync: SelectionSync::new(),
            toolbar: ToolbarLine::default(),
            dictation,
            file_path: None,
            scroll_top: 0,
            last_view_height: 1,
            should_quit: false,
            dirty: false,
            status_message: None,
            cursor_map: Vec::new(),
            last_cursor_visual: None,
            preferred_column: None,
            menu: None,
            prompt: None,
        };
        app.refresh_toolbar();
        app
    }

    fn open_initial(&mut self, path: PathBuf) {
        if path.exists() {
            self.open_file(path);
        } else {
            self.file_path = Some(path);
            self.set_status("New note");
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);
        let toolbar_area = vertical[0];
        let editor_area = vertical[1];
        let status_area = vertical[2];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];

        frame.render_widget(self.toolbar_widget(), toolbar_area);

        let render = render_document(&self.editor, text_area.width.max(1) as usize, &self.theme);
        self.cursor_map = render.cursor_map.clone();
        self.last_cursor_visual = render.cursor;

        let viewport_height = text_area.height as usize;
        self.last_view_height = viewport_height.max(1);
        self.adjust_scroll(&render, viewport_height);

        let paragraph =
            Paragraph::new(Text::from(render.lines.clone())).scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        let mut scrollbar_state = ScrollbarState::new(render.total_lines).position(self.scroll_top);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);

        if let Some(prompt) = &self.prompt {
            let text = format!(" {}: {}", prompt.kind.label(), prompt.input);
            let cursor_x = status_area.x + (text.chars().count() as u16).min(status_area.width - 1);
            frame.render_widget(
                Paragraph::new(Line::from(text)).style(self.theme.status_bar_style()),
                status_area,
            );
            frame.set_cursor_position(Position::new(cursor_x, status_area.y));
        } else {
            frame.render_widget(self.status_widget(), status_area);
            if let Some(cursor) = render.cursor {
                if cursor.line >= self.scroll_top
                    && cursor.line < self.scroll_top + viewport_height
                    && text_area.width > 0
                    && self.menu.is_none()
                {
                    let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
                    let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
                    frame.set_cursor_position(Position::new(cursor_x, cursor_y));
                }
            }
        }

        if self.menu.is_some() {
            self.render_menu(frame, area);
        }
    }

    fn toolbar_widget(&self) -> Paragraph<'static> {
        let state = &self.toolbar.state;
        let base = self.theme.toolbar_style();
        let family = if state.family_label().is_empty() {
            "-".to_string()
        } else {
            state.family_label().to_string()
        };
        let size = state.font_size.map_or_else(|| "-".to_string(), |_| state.size_label());

        let mut spans = vec![
            Span::styled(format!(" {family} "), base),
            Span::styled("│", base),
            Span::styled(format!(" {size} "), base),
            Span::styled("│ ", base),
            Span::styled(
                "B",
                self.theme.toggle_style(state.bold).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ", base),
            Span::styled(
                "I",
                self.theme.toggle_style(state.italic).add_modifier(Modifier::ITALIC),
            ),
            Span::styled(" ", base),
            Span::styled(
                "U",
                self.theme
                    .toggle_style(state.underline)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            Span::styled(" │ ", base),
        ];
        match self.dictation.state() {
            DictationState::Listening => {
                spans.push(Span::styled("● Listening", self.theme.listening_style()));
            }
            DictationState::Stopped => {
                spans.push(Span::styled("○ Dictation off", base));
            }
        }
        Paragraph::new(Line::from(spans)).style(base)
    }

    fn status_widget(&mut self) -> Paragraph<'static> {
        self.prune_status_message();
        let style = self.theme.status_bar_style();
        let name = self
            .file_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        let marker = if self.dirty { "*" } else { "" };
        let tail = match &self.status_message {
            Some((message, _)) => message.clone(),
            None => "Esc menu | Ctrl-D dictate | Ctrl-S save | Ctrl-Q quit".to_string(),
        };
        let line = Line::from(vec![
            Span::styled(format!(" {name}{marker}"), self.theme.filename_style()),
            Span::styled(
                format!(
                    " | Current Note Length: {} characters | {tail}",
                    self.editor.length()
                ),
                style,
            ),
        ]);
        Paragraph::new(line).style(style)
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        let Some(menu) = &self.menu else {
            return;
        };

        if area.width < 3 || area.height < 3 {
            return;
        }

        let max_label_width = menu
            .entries
            .iter()
            .map(|entry| match entry {
                MenuEntry::Item(item) => item.label.chars().count(),
                MenuEntry::Section(title) => title.chars().count(),
                MenuEntry::Separator => 0,
            })
            .max()
            .unwrap_or(0);
        let content_width = (max_label_width + 3) as u16;
        let width = (content_width + 4).min(area.width).max(10.min(area.width));
        let height = (menu.entries.len() as u16 + 2).min(area.height);

        let popup_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, popup_area);

        let popup_style = self.theme.menu_style();
        let separator_width = popup_area.width.saturating_sub(4).max(4) as usize;
        let items: Vec<ListItem> = menu
            .entries
            .iter()
            .map(|entry| match entry {
                MenuEntry::Section(title) => ListItem::new(Line::from(Span::styled(
                    *title,
                    popup_style.add_modifier(Modifier::BOLD),
                ))),
                MenuEntry::Separator => ListItem::new(Line::from(Span::styled(
                    "─".repeat(separator_width),
                    popup_style,
                ))),
                MenuEntry::Item(item) => ListItem::new(Line::from(format!(
                    "{label:<width$}  {key}",
                    label = item.label,
                    width = max_label_width,
                    key = item.shortcut,
                ))),
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(menu.selected_index));

        let list = List::new(items)
            .highlight_style(self.theme.menu_selected_style())
            .style(popup_style)
            .block(
                Block::default()
                    .title("Menu")
                    .borders(Borders::ALL)
                    .style(popup_style),
            );

        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(cursor) = &render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport {
                self.scroll_top = cursor.line.saturating_add(1).saturating_sub(viewport);
            }
        }
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message {
            if instant.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    fn visual_of(&self, position: TextPosition) -> Option<CursorVisualPosition> {
        self.cursor_map
            .iter()
            .find(|(candidate, _)| *candidate == position)
            .map(|(_, visual)| *visual)
    }

    fn closest_position_on_line(&self, line: usize, column: u16) -> Option<TextPosition> {
        self.cursor_map
            .iter()
            .filter(|(_, visual)| visual.line == line)
            .min_by_key(|(_, visual)| column_distance(visual.column, column))
            .map(|(position, _)| *position)
    }

    fn move_cursor_vertical(&mut self, delta: i64, extend: bool) {
        let Some(current) = self
            .visual_of(self.editor.caret())
            .or(self.last_cursor_visual)
        else {
            return;
        };
        let column = self.preferred_column.unwrap_or(current.column);
        let max_line = self
            .cursor_map
            .iter()
            .map(|(_, visual)| visual.line)
            .max()
            .unwrap_or(0);
        let target = (current.line as i64 + delta).clamp(0, max_line as i64) as usize;
        if let Some(position) = self.closest_position_on_line(target, column) {
            self.editor.move_to(position, extend);
            self.preferred_column = Some(column);
        }
    }

    fn move_to_visual_line_edge(&mut self, end: bool, extend: bool) {
        let Some(current) = self.visual_of(self.editor.caret()) else {
            if end {
                self.editor.move_to_paragraph_end(extend);
            } else {
                self.editor.move_to_paragraph_start(extend);
            }
            return;
        };
        let on_line = self
            .cursor_map
            .iter()
            .filter(|(_, visual)| visual.line == current.line);
        let target = if end {
            on_line.max_by_key(|(position, visual)| (visual.column, *position))
        } else {
            on_line.min_by_key(|(position, visual)| (visual.column, *position))
        };
        if let Some((position, _)) = target.copied() {
            self.editor.move_to(position, extend);
        }
    }

    fn handle_event(&mut self, event: Event) {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };

        let before = (self.editor.caret(), self.editor.anchor());

        if self.prompt.is_some() {
            self.handle_prompt_key(code);
        } else if self.menu.is_some() {
            self.handle_menu_key(code);
        } else {
            self.handle_editor_key(code, modifiers);
        }

        let moved = before != (self.editor.caret(), self.editor.anchor());
        self.process_changes(moved);
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Char(ch) => prompt.input.push(ch),
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        let input = prompt.input.trim();
        match prompt.kind {
            PromptKind::Open if !input.is_empty() => self.open_file(PathBuf::from(input)),
            PromptKind::SaveAs if !input.is_empty() => {
                self.file_path = Some(PathBuf::from(input));
                self.save();
            }
            PromptKind::FontSize => {
                self.control(ControlChange::FontSizeText(prompt.input));
            }
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, code: KeyCode) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        let action = match code {
            KeyCode::Esc => {
                self.menu = None;
                return;
            }
            KeyCode::Up => {
                menu.move_selection(-1);
                return;
            }
            KeyCode::Down => {
                menu.move_selection(1);
                return;
            }
            KeyCode::Enter => menu.current_action(),
            KeyCode::Char(ch) => menu.shortcut_action(ch.to_ascii_lowercase()),
            _ => None,
        };
        if let Some(action) = action {
            self.menu = None;
            self.execute_menu_action(action);
        }
    }

    fn execute_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::New => self.new_note(),
            MenuAction::Open => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Open,
                    input: String::new(),
                });
            }
            MenuAction::Save => self.save(),
            MenuAction::Exit => self.should_quit = true,
            MenuAction::Toggle(kind) => self.toggle(kind),
            MenuAction::NextFontFamily => self.next_font_family(),
            MenuAction::NextFontSize => self.next_font_size(),
            MenuAction::FontSize => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::FontSize,
                    input: self.toolbar.state.size_label(),
                });
            }
            MenuAction::Dictation => self.toggle_dictation(),
        }
    }

    fn handle_editor_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        let alt = modifiers.contains(KeyModifiers::ALT);
        let shift = modifiers.contains(KeyModifiers::SHIFT);

        if !matches!(code, KeyCode::Up | KeyCode::Down) {
            self.preferred_column = None;
        }

        match code {
            KeyCode::Esc => self.menu = Some(MenuState::new()),
            KeyCode::Char('p') if ctrl => self.menu = Some(MenuState::new()),
            KeyCode::Char('q') if ctrl => self.execute_menu_action(MenuAction::Exit),
            KeyCode::Char('s') if ctrl => self.execute_menu_action(MenuAction::Save),
            KeyCode::Char('o') if ctrl => self.execute_menu_action(MenuAction::Open),
            KeyCode::Char('n') if ctrl => self.execute_menu_action(MenuAction::New),
            KeyCode::Char('d') if ctrl => self.execute_menu_action(MenuAction::Dictation),
            KeyCode::Char('f') if ctrl => self.execute_menu_action(MenuAction::NextFontFamily),
            KeyCode::Char('e') if ctrl => self.execute_menu_action(MenuAction::NextFontSize),
            KeyCode::Char('g') if ctrl => self.execute_menu_action(MenuAction::FontSize),
            KeyCode::Char('a') if ctrl => {
                self.editor.select_all();
            }
            KeyCode::Char(ch) if alt => {
                let kind = match ch.to_ascii_lowercase() {
                    'b' => AttributeKind::Bold,
                    'i' => AttributeKind::Italic,
                    'u' => AttributeKind::Underline,
                    _ => return,
                };
                self.execute_menu_action(MenuAction::Toggle(kind));
            }
            KeyCode::Char(ch) if !ctrl => {
                self.editor.insert_char(ch);
            }
            KeyCode::Left => {
                self.editor.move_left(shift);
            }
            KeyCode::Right => {
                self.editor.move_right(shift);
            }
            KeyCode::Up => self.move_cursor_vertical(-1, shift),
            KeyCode::Down => self.move_cursor_vertical(1, shift),
            KeyCode::Home => self.move_to_visual_line_edge(false, shift),
            KeyCode::End => self.move_to_visual_line_edge(true, shift),
            KeyCode::PageUp => {
                self.scroll_top = self.scroll_top.saturating_sub(self.last_view_height);
            }
            KeyCode::PageDown => {
                self.scroll_top += self.last_view_height;
            }
            KeyCode::Backspace => {
                self.editor.backspace();
            }
            KeyCode::Delete => {
                self.editor.delete();
            }
            KeyCode::Enter => {
                self.editor.insert_paragraph_break();
            }
            KeyCode::Tab => {
                self.editor.insert_char('\t');
            }
            _ => {}
        }
    }

    /// Drains the editor's change notifications and re-queries the toolbar
    /// when the selection or the text under it may have moved.
    fn process_changes(&mut self, caret_moved: bool) {
        let changes = self.editor.take_changes();
        if !changes.is_empty() {
            self.dirty = true;
        }
        if caret_moved || changes.iter().any(|change| change.shifts_selection) {
            self.refresh_toolbar();
        }
    }

    fn refresh_toolbar(&mut self) {
        self.sync.selection_changed(&mut self.editor, &mut self.toolbar);
    }

    fn control(&mut self, change: ControlChange) {
        match self
            .sync
            .control_changed(&mut self.editor, change, &mut self.toolbar)
        {
            ControlOutcome::Rejected(err) => self.set_status(err.to_string()),
            ControlOutcome::Applied
            | ControlOutcome::Unchanged
            | ControlOutcome::Suppressed
            | ControlOutcome::Ignored => {}
        }
    }

    /// Turns `kind` on unless the whole selection already has it.
    fn toggle(&mut self, kind: AttributeKind) {
        let on = !self.editor.query_attribute(kind).is_on();
        let change = match kind {
            AttributeKind::Bold => ControlChange::Bold(on),
            AttributeKind::Italic => ControlChange::Italic(on),
            AttributeKind::Underline => ControlChange::Underline(on),
            AttributeKind::FontFamily | AttributeKind::FontSize => return,
        };
        self.control(change);
    }

    fn next_font_family(&mut self) {
        let current = self.toolbar.state.font_family.as_deref();
        let Some(next) = self.config.next_font_family(current).map(str::to_string) else {
            return;
        };
        self.control(ControlChange::FontFamily(next));
    }

    fn next_font_size(&mut self) {
        let Some(next) = self.config.next_font_size(self.toolbar.state.font_size) else {
            return;
        };
        self.control(ControlChange::FontSizeText(next.to_string()));
    }

    fn toggle_dictation(&mut self) {
        match self.dictation.toggle() {
            Ok(DictationState::Listening) => self.set_status("Listening..."),
            Ok(DictationState::Stopped) => self.set_status("Dictation stopped"),
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn new_note(&mut self) {
        self.editor.clear();
        self.editor.take_changes();
        self.file_path = None;
        self.dirty = false;
        self.refresh_toolbar();
    }

    fn open_file(&mut self, path: PathBuf) {
        match self.editor.load_file(&path) {
            Ok(()) => {
                self.editor.take_changes();
                self.dirty = false;
                self.scroll_top = 0;
                self.set_status(format!("Opened {}", path.display()));
                self.file_path = Some(path);
                self.refresh_toolbar();
            }
            Err(err) => {
                error!(path = %path.display(), %err, "failed to open note");
                self.set_status(format!("Cannot open {}: {err}", path.display()));
            }
        }
    }

    fn save(&mut self) {
        let Some(path) = self.file_path.clone() else {
            self.prompt = Some(Prompt {
                kind: PromptKind::SaveAs,
                input: String::new(),
            });
            return;
        };
        match self.editor.save_file(&path) {
            Ok(()) => {
                self.dirty = false;
                self.set_status("Saved");
            }
            Err(err) => {
                error!(path = %path.display(), %err, "failed to save note");
                self.set_status(format!("Cannot save {}: {err}", path.display()));
            }
        }
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
        let was_listening = self.dictation.is_listening();
        let appended = self.dictation.pump(&mut self.editor);
        if appended > 0 {
            info!(appended, "dictated paragraphs added");
        }
        self.process_changes(false);
        if was_listening && !self.dictation.is_listening() {
            self.set_status("Dictation ended");
        }
    }
}
