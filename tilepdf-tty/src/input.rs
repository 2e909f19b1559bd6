use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use tilepdf_core::layout::DEFAULT_ZOOM_PERCENT;
use tilepdf_core::Zoom;

/// Viewer operations reachable from the keyboard or the mouse wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerCommand {
    ScrollDown { count: usize },
    ScrollUp { count: usize },
    ScrollLeft { count: usize },
    ScrollRight { count: usize },
    PageDown,
    PageUp,
    NextPage { count: usize },
    PrevPage { count: usize },
    /// 1-based; `usize::MAX` stands for the last page.
    GotoPage { page: usize },
    TopEdge,
    BottomEdge,
    ZoomIn,
    ZoomOut,
    SetZoom(Zoom),
    ZoomToWidthOfVisiblePages,
    ToggleContinuous,
    RotateClockwise,
    RotateCounterClockwise,
    ToggleReverseVideo,
    JumpBackward,
    JumpForward,
    SearchNext { count: usize },
    SearchPrev { count: usize },
    CopySelection,
    Reload,
}

/// Pointer gestures. Positions are terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Press,
    Drag,
    Release,
    Hover,
    PanStart,
    PanMove,
    PanEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(ViewerCommand),
    Pointer {
        action: PointerAction,
        column: u16,
        row: u16,
    },
    Resize {
        columns: u16,
        rows: u16,
    },
    BeginSearch,
    SearchQueryChanged { query: String },
    SearchSubmit { query: String },
    SearchCancel,
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

/// What a key does in normal mode.
enum Binding {
    Fixed(ViewerCommand),
    /// Takes the numeric prefix, 1 when absent.
    Counted(fn(usize) -> ViewerCommand),
    /// Takes the numeric prefix as a page, the last page when absent.
    PageOrLast,
    Search,
    Quit,
}

fn normal_binding(code: KeyCode, modifiers: KeyModifiers) -> Option<Binding> {
    use Binding::*;
    use ViewerCommand as C;

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let plain = modifiers.difference(KeyModifiers::SHIFT).is_empty();
    if ctrl {
        return match code {
            KeyCode::Char('o') => Some(Fixed(C::JumpBackward)),
            KeyCode::Char('i') | KeyCode::Tab => Some(Fixed(C::JumpForward)),
            KeyCode::Char('l') => Some(Fixed(C::Reload)),
            _ => None,
        };
    }
    if !plain {
        return None;
    }
    let binding = match code {
        KeyCode::Char('j') | KeyCode::Down => Counted(|count| C::ScrollDown { count }),
        KeyCode::Char('k') | KeyCode::Up => Counted(|count| C::ScrollUp { count }),
        KeyCode::Char('h') | KeyCode::Left => Counted(|count| C::ScrollLeft { count }),
        KeyCode::Char('l') | KeyCode::Right => Counted(|count| C::ScrollRight { count }),
        KeyCode::Char(' ') | KeyCode::PageDown => Fixed(C::PageDown),
        KeyCode::Char('b') | KeyCode::PageUp | KeyCode::Backspace => Fixed(C::PageUp),
        KeyCode::Char('J') => Counted(|count| C::NextPage { count }),
        KeyCode::Char('K') => Counted(|count| C::PrevPage { count }),
        KeyCode::Char('g') | KeyCode::Home => Counted(|page| C::GotoPage { page }),
        KeyCode::Char('G') | KeyCode::End => PageOrLast,
        KeyCode::Char('t') => Fixed(C::TopEdge),
        KeyCode::Char('B') => Fixed(C::BottomEdge),
        KeyCode::Char('+') => Fixed(C::ZoomIn),
        KeyCode::Char('-') => Fixed(C::ZoomOut),
        KeyCode::Char('=') => Fixed(C::SetZoom(Zoom::Percent(DEFAULT_ZOOM_PERCENT))),
        KeyCode::Char('z') => Fixed(C::SetZoom(Zoom::FitPage)),
        KeyCode::Char('w') => Fixed(C::SetZoom(Zoom::FitWidth)),
        KeyCode::Char('e') => Fixed(C::SetZoom(Zoom::FitHeight)),
        KeyCode::Char('W') => Fixed(C::ZoomToWidthOfVisiblePages),
        KeyCode::Char('c') => Fixed(C::ToggleContinuous),
        KeyCode::Char('r') => Fixed(C::RotateClockwise),
        KeyCode::Char('R') => Fixed(C::RotateCounterClockwise),
        KeyCode::Char('d') => Fixed(C::ToggleReverseVideo),
        KeyCode::Char('y') => Fixed(C::CopySelection),
        KeyCode::Char('n') => Counted(|count| C::SearchNext { count }),
        KeyCode::Char('N') => Counted(|count| C::SearchPrev { count }),
        KeyCode::Tab => Fixed(C::JumpForward),
        KeyCode::Char('/') => Search,
        KeyCode::Char('q') | KeyCode::Esc => Quit,
        _ => return None,
    };
    Some(binding)
}

/// Vim-style count typed before a command.
#[derive(Debug, Default)]
struct CountPrefix {
    digits: String,
}

impl CountPrefix {
    fn push(&mut self, digit: char) {
        // A leading zero is not a count.
        if self.digits.is_empty() && digit == '0' {
            return;
        }
        if self.digits.len() < 9 {
            self.digits.push(digit);
        }
    }

    fn take(&mut self) -> Option<usize> {
        let value = self.digits.parse().ok();
        self.digits.clear();
        value
    }

    fn as_str(&self) -> &str {
        &self.digits
    }
}

/// Turns crossterm events into viewer events, keeping the numeric prefix and
/// the search query being typed.
#[derive(Debug, Default)]
pub struct EventMapper {
    count: CountPrefix,
    mode: InputMode,
    query: String,
}

impl EventMapper {
    /// Lines scrolled per mouse wheel notch.
    pub const WHEEL_LINES: usize = 3;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    fn enter(&mut self, mode: InputMode) {
        self.mode = mode;
        self.count.take();
        self.query.clear();
    }

    /// Prefix or query typed so far, for the status line.
    pub fn pending_input(&self) -> Option<String> {
        match self.mode {
            InputMode::Search => Some(format!("/{}", self.query)),
            InputMode::Normal if !self.count.as_str().is_empty() => {
                Some(self.count.as_str().to_string())
            }
            InputMode::Normal => None,
        }
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Resize(columns, rows) => UiEvent::Resize { columns, rows },
            Event::Mouse(mouse) => map_mouse(mouse),
            Event::Key(key) if key.kind != KeyEventKind::Release => match self.mode {
                InputMode::Normal => self.map_key(key),
                InputMode::Search => self.edit_query(key),
            },
            _ => UiEvent::None,
        }
    }

    fn map_key(&mut self, key: KeyEvent) -> UiEvent {
        if let KeyCode::Char(digit @ '0'..='9') = key.code {
            if key.modifiers.is_empty() {
                self.count.push(digit);
                return UiEvent::None;
            }
        }
        let count = self.count.take();
        match normal_binding(key.code, key.modifiers) {
            Some(Binding::Fixed(command)) => UiEvent::Command(command),
            Some(Binding::Counted(build)) => {
                UiEvent::Command(build(count.filter(|&n| n > 0).unwrap_or(1)))
            }
            Some(Binding::PageOrLast) => UiEvent::Command(ViewerCommand::GotoPage {
                page: count.unwrap_or(usize::MAX),
            }),
            Some(Binding::Search) => {
                self.enter(InputMode::Search);
                UiEvent::BeginSearch
            }
            Some(Binding::Quit) => UiEvent::Quit,
            None => UiEvent::None,
        }
    }

    fn edit_query(&mut self, key: KeyEvent) -> UiEvent {
        match key.code {
            KeyCode::Esc => {
                self.enter(InputMode::Normal);
                UiEvent::SearchCancel
            }
            KeyCode::Enter => {
                let query = std::mem::take(&mut self.query);
                self.enter(InputMode::Normal);
                UiEvent::SearchSubmit { query }
            }
            KeyCode::Backspace => {
                self.query.pop();
                UiEvent::SearchQueryChanged {
                    query: self.query.clone(),
                }
            }
            KeyCode::Char(c) if key.modifiers.difference(KeyModifiers::SHIFT).is_empty() => {
                self.query.push(c);
                UiEvent::SearchQueryChanged {
                    query: self.query.clone(),
                }
            }
            _ => UiEvent::None,
        }
    }
}

/// Left button selects, middle button pans, the wheel scrolls.
fn map_mouse(mouse: MouseEvent) -> UiEvent {
    let action = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerAction::Press,
        MouseEventKind::Drag(MouseButton::Left) => PointerAction::Drag,
        MouseEventKind::Up(MouseButton::Left) => PointerAction::Release,
        MouseEventKind::Down(MouseButton::Middle) => PointerAction::PanStart,
        MouseEventKind::Drag(MouseButton::Middle) => PointerAction::PanMove,
        MouseEventKind::Up(MouseButton::Middle) => PointerAction::PanEnd,
        MouseEventKind::Moved => PointerAction::Hover,
        MouseEventKind::ScrollDown => {
            return UiEvent::Command(ViewerCommand::ScrollDown {
                count: EventMapper::WHEEL_LINES,
            })
        }
        MouseEventKind::ScrollUp => {
            return UiEvent::Command(ViewerCommand::ScrollUp {
                count: EventMapper::WHEEL_LINES,
            })
        }
        _ => return UiEvent::None,
    };
    UiEvent::Pointer {
        action,
        column: mouse.column,
        row: mouse.row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn typed(mapper: &mut EventMapper, keys: &str) -> Vec<UiEvent> {
        keys.chars()
            .map(|c| {
                let modifiers = if c.is_ascii_uppercase() {
                    KeyModifiers::SHIFT
                } else {
                    KeyModifiers::NONE
                };
                mapper.map_event(press(KeyCode::Char(c), modifiers))
            })
            .collect()
    }

    fn last_command(mapper: &mut EventMapper, keys: &str) -> ViewerCommand {
        match typed(mapper, keys).pop() {
            Some(UiEvent::Command(command)) => command,
            other => panic!("{keys:?} produced {other:?}"),
        }
    }

    #[test]
    fn counts_apply_to_the_next_command_only() {
        let mut mapper = EventMapper::new();
        let events = typed(&mut mapper, "12");
        assert_eq!(events, vec![UiEvent::None, UiEvent::None]);
        assert_eq!(mapper.pending_input().as_deref(), Some("12"));

        assert_eq!(
            last_command(&mut mapper, "j"),
            ViewerCommand::ScrollDown { count: 12 }
        );
        assert_eq!(mapper.pending_input(), None);
        assert_eq!(
            last_command(&mut mapper, "k"),
            ViewerCommand::ScrollUp { count: 1 }
        );
    }

    #[test]
    fn uncounted_commands_discard_the_prefix() {
        let mut mapper = EventMapper::new();
        assert_eq!(last_command(&mut mapper, "4c"), ViewerCommand::ToggleContinuous);
        assert_eq!(
            last_command(&mut mapper, "J"),
            ViewerCommand::NextPage { count: 1 }
        );
        assert_eq!(typed(&mut mapper, "0"), vec![UiEvent::None]);
        assert_eq!(mapper.pending_input(), None);
    }

    #[test]
    fn page_jumps() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            last_command(&mut mapper, "g"),
            ViewerCommand::GotoPage { page: 1 }
        );
        assert_eq!(
            last_command(&mut mapper, "G"),
            ViewerCommand::GotoPage { page: usize::MAX }
        );
        assert_eq!(
            last_command(&mut mapper, "7G"),
            ViewerCommand::GotoPage { page: 7 }
        );
        assert_eq!(
            last_command(&mut mapper, "3K"),
            ViewerCommand::PrevPage { count: 3 }
        );
    }

    #[test]
    fn zoom_keys() {
        let mut mapper = EventMapper::new();
        let expected = [
            ("z", ViewerCommand::SetZoom(Zoom::FitPage)),
            ("w", ViewerCommand::SetZoom(Zoom::FitWidth)),
            ("e", ViewerCommand::SetZoom(Zoom::FitHeight)),
            ("=", ViewerCommand::SetZoom(Zoom::Percent(125.0))),
            ("W", ViewerCommand::ZoomToWidthOfVisiblePages),
            ("+", ViewerCommand::ZoomIn),
            ("-", ViewerCommand::ZoomOut),
        ];
        for (keys, command) in expected {
            assert_eq!(last_command(&mut mapper, keys), command, "key {keys}");
        }
    }

    #[test]
    fn control_keys_walk_history_and_reload() {
        let mut mapper = EventMapper::new();
        let ctrl = |c| press(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(
            mapper.map_event(ctrl('o')),
            UiEvent::Command(ViewerCommand::JumpBackward)
        );
        assert_eq!(
            mapper.map_event(ctrl('i')),
            UiEvent::Command(ViewerCommand::JumpForward)
        );
        assert_eq!(
            mapper.map_event(press(KeyCode::Tab, KeyModifiers::NONE)),
            UiEvent::Command(ViewerCommand::JumpForward)
        );
        assert_eq!(
            mapper.map_event(ctrl('l')),
            UiEvent::Command(ViewerCommand::Reload)
        );
        // Ctrl does not fall through to the plain binding.
        assert_eq!(mapper.map_event(ctrl('j')), UiEvent::None);
    }

    #[test]
    fn search_mode_edits_and_submits_a_query() {
        let mut mapper = EventMapper::new();
        assert_eq!(typed(&mut mapper, "/"), vec![UiEvent::BeginSearch]);
        assert_eq!(mapper.mode(), InputMode::Search);
        assert_eq!(mapper.pending_input().as_deref(), Some("/"));

        // Command keys are text while searching.
        let events = typed(&mut mapper, "qx");
        assert_eq!(
            events[1],
            UiEvent::SearchQueryChanged {
                query: "qx".into()
            }
        );
        assert_eq!(
            mapper.map_event(press(KeyCode::Backspace, KeyModifiers::NONE)),
            UiEvent::SearchQueryChanged { query: "q".into() }
        );
        assert_eq!(
            mapper.map_event(press(KeyCode::Enter, KeyModifiers::NONE)),
            UiEvent::SearchSubmit { query: "q".into() }
        );
        assert_eq!(mapper.mode(), InputMode::Normal);
        assert_eq!(
            last_command(&mut mapper, "2n"),
            ViewerCommand::SearchNext { count: 2 }
        );
    }

    #[test]
    fn escape_leaves_search_without_quitting() {
        let mut mapper = EventMapper::new();
        typed(&mut mapper, "/ab");
        assert_eq!(
            mapper.map_event(press(KeyCode::Esc, KeyModifiers::NONE)),
            UiEvent::SearchCancel
        );
        assert_eq!(mapper.pending_input(), None);
        assert_eq!(typed(&mut mapper, "q"), vec![UiEvent::Quit]);
    }

    #[test]
    fn mouse_gestures() {
        let mut mapper = EventMapper::new();
        let mouse = |kind, column, row| {
            Event::Mouse(MouseEvent {
                kind,
                column,
                row,
                modifiers: KeyModifiers::NONE,
            })
        };
        assert_eq!(
            mapper.map_event(mouse(MouseEventKind::Down(MouseButton::Left), 4, 2)),
            UiEvent::Pointer {
                action: PointerAction::Press,
                column: 4,
                row: 2
            }
        );
        assert_eq!(
            mapper.map_event(mouse(MouseEventKind::Drag(MouseButton::Middle), 1, 1)),
            UiEvent::Pointer {
                action: PointerAction::PanMove,
                column: 1,
                row: 1
            }
        );
        assert_eq!(
            mapper.map_event(mouse(MouseEventKind::ScrollDown, 0, 0)),
            UiEvent::Command(ViewerCommand::ScrollDown {
                count: EventMapper::WHEEL_LINES
            })
        );
        assert_eq!(
            mapper.map_event(mouse(MouseEventKind::Down(MouseButton::Right), 0, 0)),
            UiEvent::None
        );
    }

    #[test]
    fn resize_is_reported_while_searching() {
        let mut mapper = EventMapper::new();
        typed(&mut mapper, "/");
        assert_eq!(
            mapper.map_event(Event::Resize(80, 24)),
            UiEvent::Resize {
                columns: 80,
                rows: 24
            }
        );
    }
}
