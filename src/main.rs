mod demo;

use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use confman::config_io::{self, DirectoryContext};
use confman::model::TypeKey;
use confman::services::tracing_setup;
use confman::ConfigManager;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::Alignment;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::{DefaultTerminal, Frame};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Terminal settings editor hosting a set of sample plugins
#[derive(Parser, Debug)]
#[command(name = "confman")]
#[command(about = "Browse and edit plugin settings in the terminal", long_about = None)]
#[command(version)]
struct Args {
    /// Directory for settings and plugin config files
    #[arg(long, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    /// Path to log file (default: data dir/logs/confman.log)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Start in debug mode
    #[arg(long)]
    debug: bool,

    /// Rebuild the filtered list on a worker thread
    #[arg(long)]
    background_rebuild: bool,

    /// Print the directories used by confman and exit
    #[arg(long)]
    show_paths: bool,
}

/// How long to wait for input before drawing again
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn directories(args: &Args) -> AnyhowResult<DirectoryContext> {
    let mut dir_context =
        DirectoryContext::from_system().context("Failed to resolve config directories")?;
    if let Some(config_dir) = &args.config_dir {
        dir_context.config_dir = config_dir.clone();
    }
    Ok(dir_context)
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();
    let dir_context = directories(&args)?;

    if args.show_paths {
        println!("Config: {}", dir_context.config_dir.display());
        println!("Settings: {}", dir_context.settings_path().display());
        println!("Plugins: {}", dir_context.plugin_config_dir().display());
        println!("Log: {}", dir_context.log_path().display());
        return Ok(());
    }

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| dir_context.log_path());
    if !tracing_setup::init_global(&log_file, tracing_setup::DEFAULT_FILTER) {
        eprintln!("Warning: logging disabled, cannot write {}", log_file.display());
    }
    tracing::info!("confman {} starting", env!("CARGO_PKG_VERSION"));

    config_io::probe_writable(&dir_context);
    let mut settings = config_io::load_settings(&dir_context);
    settings.show_debug = args.debug;
    if args.background_rebuild {
        settings.background_rebuild = true;
    }

    let host = demo::build_host(&dir_context);
    let mut app = ConfigManager::new(Rc::new(host), settings).with_directories(dir_context);
    app.register_type_renderer(
        TypeKey::custom(demo::COLOR_TYPE),
        Rc::new(demo::ColorRenderer),
    )
    .context("Failed to register colour renderer")?;
    app.set_displaying(true);

    let terminal = ratatui::init();
    let result = run(&mut app, terminal);
    ratatui::restore();

    app.set_displaying(false);
    tracing::info!("confman exiting");
    result
}

fn is_quit(key_event: &KeyEvent) -> bool {
    matches!(
        key_event,
        KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::CONTROL,
            ..
        }
    )
}

fn run(app: &mut ConfigManager, mut terminal: DefaultTerminal) -> AnyhowResult<()> {
    loop {
        terminal.draw(|frame| draw(app, frame))?;

        // Timeout keeps frames coming while a background rebuild is pending
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind != KeyEventKind::Press {
                continue;
            }
            if is_quit(&key_event) {
                return Ok(());
            }
            app.handle_key(key_event);
        }
    }
}

fn draw(app: &mut ConfigManager, frame: &mut Frame<'_>) {
    if app.is_displaying() {
        app.render(frame);
        return;
    }
    let hint = format!(
        "Settings hidden. Press {} to open them, Ctrl+Q to quit.",
        app.settings().toggle_shortcut
    );
    let paragraph = Paragraph::new(vec![Line::from(""), Line::from(hint)])
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, frame.area());
}
