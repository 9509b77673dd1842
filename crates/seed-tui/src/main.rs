use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use seed_client::HttpGateway;
use seed_config::{ConfigManager, JsonFileStore};
use seed_core::{
    ChatGateway, ChatResult, Conversation, LocalStore, MarkdownSanitizer, MemoryStore,
};

mod app;
mod logging;
mod ui;

use app::{App, InputMode};

const TICK_RATE: Duration = Duration::from_millis(20);
const PAGE: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Terminal client for the SEED companion chat")]
#[command(version)]
struct Args {
    /// Config file path (default ~/.seed/config.json)
    #[arg(long, env = "SEED_CONFIG")]
    config: Option<String>,

    /// Backend origin, overrides server.base_url
    #[arg(long, env = "SEED_BASE_URL")]
    base_url: Option<String>,

    /// Session cookie issued by the backend after signing in
    #[arg(long, env = "SEED_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,

    /// Log level, overrides logging.level
    #[arg(long, env = "SEED_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let manager = match args.config.as_deref() {
        Some(path) => {
            let path = seed_config::expand_tilde(path)
                .with_context(|| format!("Invalid config path {}", path))?;
            ConfigManager::load(&path).await?
        }
        None => ConfigManager::load_default().await?,
    };
    let mut config = manager.snapshot().await;
    if let Some(url) = &args.base_url {
        config.set_value("server.base_url", url)?;
    }
    if let Some(cookie) = &args.session_cookie {
        config.set_value("server.session_cookie", cookie)?;
    }
    ConfigManager::validate(&config)?;

    let _log_guard = logging::init(&config.logging, args.log_level.as_deref())?;
    tracing::info!("SEED {} starting against {}", seed_core::VERSION, config.server.base_url);

    let gateway: Arc<dyn ChatGateway> = Arc::new(HttpGateway::new(
        &config.server.base_url,
        config.server.timeout(),
        config.server.session_cookie.as_deref(),
    )?);

    let login_url = config.server.login_url();
    if needs_sign_in(gateway.session_check().await) {
        print_login_notice(&login_url);
        return Ok(());
    }

    if let Err(e) = seed_config::init_seed_dirs().await {
        tracing::warn!("Failed to create ~/.seed: {}", e);
    }
    let local: Box<dyn LocalStore> = match seed_config::default_local_storage_path() {
        Some(path) => Box::new(JsonFileStore::open(path)),
        None => Box::new(MemoryStore::new()),
    };
    let conversation = Conversation::new(
        config.chat.conversation_config(),
        local,
        Arc::new(MarkdownSanitizer),
    );
    let mut app = App::new(conversation, gateway);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;
    app.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("UI loop failed: {:?}", err);
        eprintln!("Error: {:?}", err);
    }
    if app.logged_out {
        print_login_notice(&login_url);
    }

    Ok(())
}

/// Only an explicit `logged_in: false` stops startup. When the check itself
/// fails the client starts anyway and sends surface their own errors.
fn needs_sign_in(check: ChatResult<bool>) -> bool {
    match check {
        Ok(logged_in) => !logged_in,
        Err(e) => {
            tracing::warn!("Session check failed, continuing: {}", e);
            false
        }
    }
}

fn print_login_notice(login_url: &str) {
    println!("You are not signed in to SEED.");
    println!("Sign in at {} and start the client again,", login_url);
    println!("passing the session cookie with --session-cookie or SEED_SESSION_COOKIE.");
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> anyhow::Result<()> {
    app.start(Instant::now());

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Wake up for the next typewriter step or autosave, whichever is first
        let now = Instant::now();
        let timeout = app
            .conversation
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(TICK_RATE)
            .min(TICK_RATE);

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key)?;
                }
            }
        }

        let now = Instant::now();
        app.process_events(now);
        app.on_tick(now);

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode() {
        InputMode::Normal => match key.code {
            KeyCode::Char('n') if ctrl => app.request_new_chat(),
            // many terminals deliver Ctrl+H as Backspace
            KeyCode::Char('h') if ctrl => app.open_history(),
            KeyCode::F(2) => app.open_history(),
            KeyCode::Char('e') if ctrl => app.toggle_stats(),
            KeyCode::Char('t') if ctrl => app.toggle_theme(),
            KeyCode::Char('l') if ctrl => app.logout(),
            KeyCode::Enter => {
                app.notice = None;
                app.submit();
            }
            KeyCode::Char(c) if !ctrl => app.push_input(c),
            KeyCode::Backspace => app.pop_input(),
            KeyCode::Up => app.scroll_up(1),
            KeyCode::Down => app.scroll_down(1),
            KeyCode::PageUp => app.scroll_up(PAGE),
            KeyCode::PageDown => app.scroll_down(PAGE),
            _ => {}
        },
        InputMode::ConfirmNewChat => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_new_chat(Instant::now()),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_dialog(),
            _ => {}
        },
        InputMode::History => match key.code {
            KeyCode::Esc => app.cancel_dialog(),
            KeyCode::Enter => app.restore_selected(),
            KeyCode::Up => app.history.select_previous(),
            KeyCode::Down => app.history.select_next(),
            KeyCode::Backspace => app.history.pop_query(),
            KeyCode::Char(c) if !ctrl => app.history.push_query(c),
            _ => {}
        },
        InputMode::Stats => match key.code {
            KeyCode::Esc | KeyCode::Enter => app.cancel_dialog(),
            KeyCode::Char('e') if ctrl => app.toggle_stats(),
            _ => {}
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::ChatError;

    #[test]
    fn test_only_logged_out_requires_sign_in() {
        assert!(needs_sign_in(Ok(false)));
        assert!(!needs_sign_in(Ok(true)));
        assert!(!needs_sign_in(Err(ChatError::network("connection refused"))));
    }
}
