pub mod app;
pub mod config;
pub mod container_management;
pub mod inputs;
pub mod io;
pub mod usage;

use app::{ui, App, AppReturn};
use eyre::Result;
use inputs::{events::Events, InputEvent};
use io::IoEvent;
use std::{io::stdout, sync::Arc, time::Duration};

pub async fn start_ui(app: &Arc<tokio::sync::Mutex<App>>, tick_rate: Duration) -> Result<()> {
    let mut stdout = stdout();
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = tui::backend::CrosstermBackend::new(stdout);
    let mut terminal = tui::Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let mut events = Events::new(tick_rate);

    // First listing of containers and images
    {
        let mut app = app.lock().await;
        app.dispatch(IoEvent::Initialize);
    }

    loop {
        // Background tasks need the lock while we wait for input.
        let event = events.next().await;

        let mut app = app.lock().await;
        let result = match event {
            InputEvent::Input(key) => app.do_action(key).await,
            InputEvent::Tick => AppReturn::Continue,
        };

        // Check if we should exit
        if result == AppReturn::Exit {
            events.close();
            break;
        }
        terminal.draw(|rect| ui::draw(rect, &app))?;
    }

    terminal.clear()?;
    terminal.show_cursor()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)?;
    crossterm::terminal::disable_raw_mode()?;

    Ok(())
}
