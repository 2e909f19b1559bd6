use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, Clear, ClearType};
use directories::ProjectDirs;
use tilepdf_core::{FindOptions, LinkAction, Rotation, Size, ViewerConfig, Viewport, Zoom};
use tilepdf_render::PdfiumProvider;
use tilepdf_tty::{
    format_status, write_status_line, DrawParams, EventMapper, KittyRenderer, PointerAction,
    TerminalHost, UiEvent, ViewerCommand,
};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Zoom levels stepped through by `+` and `-`, in percent.
const ZOOM_STEPS: [f64; 10] = [25.0, 50.0, 75.0, 100.0, 125.0, 150.0, 200.0, 300.0, 400.0, 800.0];

/// Cell size assumed when the terminal does not report its pixel size.
const FALLBACK_CELL: (u16, u16) = (8, 16);

#[derive(Debug, Parser)]
#[command(
    name = "tilepdf",
    version,
    about = "kitty-native PDF viewer with a tiled, continuous viewport"
)]
struct Args {
    /// Page to open the document on (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,

    /// Initial zoom: a percentage, or one of page, width, height
    #[arg(short = 'z', long = "zoom")]
    zoom: Option<Zoom>,

    /// Show one page at a time instead of a continuous strip
    #[arg(long = "single-page")]
    single_page: bool,

    /// Initial rotation in degrees (a multiple of 90)
    #[arg(short = 'r', long = "rotate", allow_negative_numbers = true)]
    rotate: Option<i32>,

    /// Path to the PDF file to open
    file: PathBuf,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnableMouseCapture, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, DisableMouseCapture, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

/// Terminal dimensions in cells and pixels. The last row holds the status
/// line; the rest shows the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TerminalGeometry {
    columns: u16,
    rows: u16,
    width: u16,
    height: u16,
}

impl TerminalGeometry {
    fn query() -> Result<Self> {
        let window = terminal::window_size()?;
        Ok(Self::from_window(
            window.columns,
            window.rows,
            window.width,
            window.height,
        ))
    }

    fn from_window(columns: u16, rows: u16, width: u16, height: u16) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(2);
        let (width, height) = if width == 0 || height == 0 {
            (
                columns.saturating_mul(FALLBACK_CELL.0),
                rows.saturating_mul(FALLBACK_CELL.1),
            )
        } else {
            (width, height)
        };
        Self {
            columns,
            rows,
            width,
            height,
        }
    }

    fn cell_size(&self) -> (f64, f64) {
        (
            f64::from(self.width) / f64::from(self.columns),
            f64::from(self.height) / f64::from(self.rows),
        )
    }

    fn image_rows(&self) -> u16 {
        self.rows - 1
    }

    fn frame_size(&self) -> Size {
        let (_, cell_height) = self.cell_size();
        Size::new(
            i32::from(self.width),
            (cell_height * f64::from(self.image_rows())) as i32,
        )
    }

    /// Window position of the center of a cell.
    fn cell_to_pixel(&self, column: u16, row: u16) -> (i32, i32) {
        let (cell_width, cell_height) = self.cell_size();
        let row = row.min(self.image_rows().saturating_sub(1));
        (
            ((f64::from(column) + 0.5) * cell_width) as i32,
            ((f64::from(row) + 0.5) * cell_height) as i32,
        )
    }
}

enum LoopAction {
    Continue,
    Quit,
}

/// Viewer state the event loop keeps next to the viewport.
struct Session {
    viewport: Viewport<TerminalHost>,
    geometry: TerminalGeometry,
    clipboard: Option<arboard::Clipboard>,
    last_query: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "tilepdf", "tilepdf")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let mut config = load_config(&project_dirs.config_dir().join("config.toml"))?;
    if let Some(zoom) = args.zoom {
        config.initial_zoom = zoom;
    }
    if args.single_page {
        config.continuous_mode = false;
    }
    let rotation = match args.rotate {
        Some(degrees) => Rotation::from_degrees(degrees)
            .ok_or_else(|| anyhow!("rotation must be a multiple of 90, got {degrees}"))?,
        None => Rotation::None,
    };

    let geometry = TerminalGeometry::query()?;
    let provider = PdfiumProvider::new().context("failed to bind pdfium")?;
    let host = TerminalHost::new(geometry.frame_size(), config.matte_color)
        .with_password_prompt(prompt_password);
    let initial_zoom = config.initial_zoom;
    let mut viewport = Viewport::new(Box::new(provider), host, config);
    viewport
        .load_file(&args.file, None, None)
        .with_context(|| format!("failed to open {:?}", args.file))?;
    let page = args.page.unwrap_or(1).clamp(1, viewport.page_count().max(1));

    let clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => Some(clipboard),
        Err(err) => {
            warn!(?err, "system clipboard unavailable");
            None
        }
    };

    let _raw = RawModeGuard::new()?;
    let mut renderer = KittyRenderer::new(io::stdout());
    renderer.clear_all()?;

    let mut session = Session {
        viewport,
        geometry,
        clipboard,
        last_query: None,
    };
    session
        .viewport
        .display_page(page, initial_zoom, rotation, true, true);

    let mut event_mapper = EventMapper::new();
    let mut dirty = true;

    loop {
        if session.viewport.host_mut().take_dirty().is_some() {
            dirty = true;
        }
        if dirty {
            present(&mut renderer, &session, &event_mapper)?;
            dirty = false;
        }
        if session.viewport.host().should_quit() {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            let ui_event = event_mapper.map_event(event::read()?);
            match handle_event(ui_event, &mut session)? {
                LoopAction::Continue => {}
                LoopAction::Quit => break,
            }
            for action in session.viewport.host_mut().take_external() {
                open_external(&action);
            }
            draw_status(&mut renderer, &session, &event_mapper)?;
        }
    }

    renderer.delete_images()?;
    renderer.clear_all()?;
    Ok(())
}

fn handle_event(event: UiEvent, session: &mut Session) -> Result<LoopAction> {
    match event {
        UiEvent::Command(command) => apply_command(session, command),
        UiEvent::Pointer {
            action,
            column,
            row,
        } => {
            let (x, y) = session.geometry.cell_to_pixel(column, row);
            let viewport = &mut session.viewport;
            match action {
                PointerAction::Press => viewport.start_selection(x, y),
                PointerAction::Release => match viewport.end_selection(x, y) {
                    Some(text) => publish_clipboard(&mut session.clipboard, text),
                    None => {
                        viewport.click(x, y);
                    }
                },
                PointerAction::Drag | PointerAction::Hover | PointerAction::PanMove => {
                    viewport.hover(x, y)
                }
                PointerAction::PanStart => viewport.start_pan(x, y),
                PointerAction::PanEnd => viewport.end_pan(),
            }
        }
        UiEvent::Resize { columns, rows } => {
            let window = terminal::window_size()?;
            session.geometry =
                TerminalGeometry::from_window(columns, rows, window.width, window.height);
            debug!(geometry = ?session.geometry, "terminal resized");
            let frame = session.geometry.frame_size();
            session.viewport.host_mut().resize(frame);
            session.viewport.resize(frame.width, frame.height);
        }
        UiEvent::SearchQueryChanged { query } if !query.is_empty() => {
            session.viewport.find(&query, FindOptions::default());
        }
        UiEvent::SearchSubmit { query } => {
            if !query.is_empty() {
                session.viewport.find(&query, FindOptions::default());
                session.last_query = Some(query);
            }
        }
        UiEvent::Quit => return Ok(LoopAction::Quit),
        UiEvent::SearchQueryChanged { .. }
        | UiEvent::BeginSearch
        | UiEvent::SearchCancel
        | UiEvent::None => {}
    }
    Ok(LoopAction::Continue)
}

fn apply_command(session: &mut Session, command: ViewerCommand) {
    let line = session.viewport.config().scroll_step;
    let viewport = &mut session.viewport;
    match command {
        ViewerCommand::ScrollDown { count } => {
            viewport.scroll_down_next_page(line.saturating_mul(count as i32))
        }
        ViewerCommand::ScrollUp { count } => {
            viewport.scroll_up_prev_page(line.saturating_mul(count as i32))
        }
        ViewerCommand::ScrollLeft { count } => viewport.scroll_left(line.saturating_mul(count as i32)),
        ViewerCommand::ScrollRight { count } => {
            viewport.scroll_right(line.saturating_mul(count as i32))
        }
        ViewerCommand::PageDown => viewport.scroll_page_down(),
        ViewerCommand::PageUp => viewport.scroll_page_up(),
        ViewerCommand::NextPage { count } => {
            viewport.goto_next_page(count, true);
        }
        ViewerCommand::PrevPage { count } => {
            viewport.goto_prev_page(count, true, false);
        }
        ViewerCommand::GotoPage { page } => {
            let page = page.clamp(1, viewport.page_count().max(1));
            let (zoom, rotation) = (viewport.zoom(), viewport.rotation());
            viewport.display_page(page, zoom, rotation, true, true);
        }
        ViewerCommand::TopEdge => viewport.scroll_to_top_edge(),
        ViewerCommand::BottomEdge => viewport.scroll_to_bottom_edge(),
        ViewerCommand::ZoomIn => {
            let percent = step_zoom(current_percent(viewport.dpi()), true);
            viewport.zoom_centered(Zoom::Percent(percent));
        }
        ViewerCommand::ZoomOut => {
            let percent = step_zoom(current_percent(viewport.dpi()), false);
            viewport.zoom_centered(Zoom::Percent(percent));
        }
        ViewerCommand::SetZoom(zoom) => viewport.zoom_centered(zoom),
        ViewerCommand::ZoomToWidthOfVisiblePages => viewport.zoom_to_current_width(),
        ViewerCommand::ToggleContinuous => {
            let continuous = !viewport.is_continuous();
            viewport.set_continuous_mode(continuous);
        }
        ViewerCommand::RotateClockwise => rotate_by(viewport, 90),
        ViewerCommand::RotateCounterClockwise => rotate_by(viewport, -90),
        ViewerCommand::ToggleReverseVideo => {
            let reverse = !viewport.config().reverse_video;
            viewport.set_reverse_video(reverse);
        }
        ViewerCommand::JumpBackward => {
            viewport.go_backward();
        }
        ViewerCommand::JumpForward => {
            viewport.go_forward();
        }
        ViewerCommand::SearchNext { count } => repeat_search(session, count, false),
        ViewerCommand::SearchPrev { count } => repeat_search(session, count, true),
        ViewerCommand::CopySelection => {
            if let Some(text) = session.viewport.copy_selection() {
                publish_clipboard(&mut session.clipboard, text);
            }
        }
        ViewerCommand::Reload => {
            let (page, zoom, rotation) = (viewport.top_page(), viewport.zoom(), viewport.rotation());
            if page > 0 {
                info!(page, "reloading view");
                viewport.display_page(page, zoom, rotation, false, false);
            }
        }
    }
}

fn repeat_search(session: &mut Session, count: usize, backward: bool) {
    let Some(query) = session.last_query.as_deref() else {
        return;
    };
    let options = FindOptions {
        next: true,
        backward,
        ..FindOptions::default()
    };
    for _ in 0..count.max(1) {
        if !session.viewport.find(query, options) {
            break;
        }
    }
}

fn rotate_by(viewport: &mut Viewport<TerminalHost>, degrees: i32) {
    if let Some(rotation) = Rotation::from_degrees(viewport.rotation().degrees() + degrees) {
        viewport.set_rotation(rotation);
    }
}

/// Effective zoom of a resolution, in percent.
fn current_percent(dpi: f64) -> f64 {
    dpi / 0.72
}

/// Next entry of [`ZOOM_STEPS`] strictly above (or below) `percent`; stays
/// at the last step past either end.
fn step_zoom(percent: f64, up: bool) -> f64 {
    const EPSILON: f64 = 0.5;
    if up {
        ZOOM_STEPS
            .iter()
            .copied()
            .find(|step| *step > percent + EPSILON)
            .unwrap_or(ZOOM_STEPS[ZOOM_STEPS.len() - 1])
    } else {
        ZOOM_STEPS
            .iter()
            .rev()
            .copied()
            .find(|step| *step < percent - EPSILON)
            .unwrap_or(ZOOM_STEPS[0])
    }
}

fn publish_clipboard(clipboard: &mut Option<arboard::Clipboard>, text: String) {
    if text.is_empty() {
        return;
    }
    let Some(clipboard) = clipboard.as_mut() else {
        debug!("no system clipboard, selection kept in the viewer only");
        return;
    };
    if let Err(err) = clipboard.set_text(text) {
        warn!(?err, "failed to copy selection to the system clipboard");
    }
}

fn open_external(action: &LinkAction) {
    match action {
        LinkAction::Uri(uri) => info!(%uri, "external link selected"),
        LinkAction::Launch { file, .. } => info!(file = %file.display(), "launch link ignored"),
        other => debug!(?other, "link action not handled"),
    }
}

fn present(
    renderer: &mut KittyRenderer<io::Stdout>,
    session: &Session,
    mapper: &EventMapper,
) -> Result<()> {
    let geometry = session.geometry;
    renderer.begin_sync_update()?;
    {
        let writer = renderer.writer();
        crossterm::execute!(writer, cursor::MoveTo(0, 0))?;
    }
    renderer.draw(
        session.viewport.host().frame(),
        DrawParams::clamped(u32::from(geometry.columns), u32::from(geometry.image_rows())),
    )?;
    draw_status(renderer, session, mapper)?;
    renderer.end_sync_update()?;
    Ok(())
}

fn draw_status(
    renderer: &mut KittyRenderer<io::Stdout>,
    session: &Session,
    mapper: &EventMapper,
) -> Result<()> {
    let pending = mapper.pending_input();
    let status = format_status(
        session.viewport.host().status(),
        session.viewport.page_count(),
        pending.as_deref(),
    );
    let width = usize::from(session.geometry.columns);
    let status: String = status.chars().take(width).collect();
    let writer = renderer.writer();
    crossterm::execute!(
        writer,
        cursor::MoveTo(0, session.geometry.rows - 1),
        Clear(ClearType::CurrentLine)
    )?;
    write_status_line(writer, &status)?;
    Ok(())
}

/// Asks for a document password on the terminal. Only called while loading,
/// before raw mode is entered.
fn prompt_password() -> Option<String> {
    let mut stderr = io::stderr();
    write!(stderr, "Password: ").ok()?;
    stderr.flush().ok()?;
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
    }
}

fn load_config(path: &Path) -> Result<ViewerConfig> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {:?}", path)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(ViewerConfig::default())
        }
        Err(err) => Err(err).with_context(|| format!("failed to read config file {:?}", path)),
    }
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "tilepdf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
