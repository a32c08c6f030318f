use anyhow::{Result, anyhow};
use clap::Parser;
use crossterm::{
    ExecutableCommand,
    event::{Event as TermEvent, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use journalscope::journal::{Event, FilterController, LogProvider, Observer, QueryError};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::io::{Stdout, Write, stdout};

mod app;
mod config;
mod logging;
mod palette;
mod systemd;
mod widgets;

use app::{Action, App};
use config::{Cli, Config};
use widgets::{
    entries_table::EntriesTable,
    help::Help,
    status_bar::{Status, StatusBar},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse())?;
    logging::init(config.debug, config.log_file.as_deref(), !config.print)?;

    if config.print {
        return print_entries(&config).await;
    }

    // Create app (runs the initial query before the terminal is taken over)
    let mut app = App::new(&config).await;

    // Setup terminal
    let mut terminal = setup_terminal()?;

    // Run app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    restore_terminal(terminal)?;

    result
}

/// Remembers every error so `--print` can fail with them.
#[derive(Default)]
struct PrintObserver {
    errors: Vec<String>,
}

impl Observer for PrintObserver {
    fn on_error(&mut self, error: &QueryError) {
        self.errors.push(error.to_string());
    }
}

async fn print_entries(config: &Config) -> Result<()> {
    let mut controller =
        FilterController::new(config.provider(), PrintObserver::default(), config.spec.clone())
            .await;
    controller.handle(Event::SearchChanged(config.search.clone())).await;

    if !controller.observer().errors.is_empty() {
        return Err(anyhow!(controller.observer().errors.join("\n")));
    }

    let mut out = stdout().lock();
    for entry in controller.visible() {
        writeln!(
            out,
            "{}\t{}\t{}",
            entry.display_time(),
            entry.process_name,
            entry.message
        )?;
    }
    out.flush()?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    Ok(())
}

async fn run_app<B: Backend, P: LogProvider>(
    terminal: &mut Terminal<B>,
    app: &mut App<P>,
) -> Result<()> {
    let mut events = EventStream::new();

    loop {
        terminal.draw(|f| draw(f, app))?;

        let Some(event) = events.next().await else {
            break;
        };
        let TermEvent::Key(key) = event? else {
            // Resize and friends only need a redraw
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key) {
            Action::Continue => {}
            Action::Quit => break,
            Action::Dispatch(event) => {
                if matches!(event, Event::Refresh | Event::FilterChanged(Some(_))) {
                    app.set_busy(true);
                    terminal.draw(|f| draw(f, app))?;
                    run_query(app, &mut events, event).await;
                    app.set_busy(false);
                } else {
                    // No provider involved, finishes without yielding to input
                    app.dispatch(event).await;
                }
            }
        }
    }

    Ok(())
}

/// Run an event that queries the provider. While it is in flight, Esc or
/// Ctrl-C cancel it and every other key is ignored.
async fn run_query<P: LogProvider>(app: &mut App<P>, events: &mut EventStream, event: Event) {
    let cancel = app.controller_mut().cancellation();
    {
        let pending = app.controller_mut().handle(event);
        tokio::pin!(pending);

        loop {
            tokio::select! {
                _ = &mut pending => break,
                next = events.next() => match next {
                    Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                        let ctrl_c = key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL);
                        if key.code == KeyCode::Esc || ctrl_c {
                            tracing::info!("Cancelling running query");
                            cancel.cancel();
                        } else {
                            tracing::debug!("Query in flight, ignoring {:?}", key.code);
                        }
                    }
                    Some(_) => {}
                    None => {
                        // Input closed: let the query finish on its own
                        pending.as_mut().await;
                        break;
                    }
                },
            }
        }
    }
    app.after_dispatch();
}

fn draw<P: LogProvider>(f: &mut Frame, app: &mut App<P>) {
    // Main layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Search line
            Constraint::Length(2), // Query description
            Constraint::Min(5),    // Entries
            Constraint::Length(1), // Status line
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_search(f, app, chunks[1]);
    draw_query(f, app, chunks[2]);
    draw_entries(f, app, chunks[3]);
    draw_status(f, app, chunks[4]);

    if let Some(editor) = app.editor() {
        f.render_widget(editor, centered_rect(70, 50, f.area()));
    }

    // Help overlay if active
    if app.show_help() {
        f.render_widget(Help, centered_rect(70, 80, f.area()));
    }
}

fn draw_header<P: LogProvider>(f: &mut Frame, app: &App<P>, area: Rect) {
    let mode_indicator = if app.is_user_mode() {
        "[user]"
    } else {
        "[system]"
    };
    let controller = app.controller();
    let title = Line::from(vec![
        Span::styled(
            "Journal entries ",
            Style::default()
                .fg(crate::palette::cyan())
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "{} {}/{} shown",
            mode_indicator,
            controller.visible_len(),
            controller.store().len()
        )),
    ]);
    let header = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_search<P: LogProvider>(f: &mut Frame, app: &App<P>, area: Rect) {
    let cursor = if app.is_editing_search() { "_" } else { "" };
    let style = if app.is_editing_search() {
        Style::default().fg(crate::palette::green())
    } else {
        Style::default().fg(crate::palette::white())
    };
    let line = Line::from(vec![
        Span::raw(" Displaying entries with the following text: "),
        Span::styled(format!("{}{}", app.search_text(), cursor), style),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_query<P: LogProvider>(f: &mut Frame, app: &App<P>, area: Rect) {
    let controller = app.controller();
    let lines = vec![
        Line::from(format!(" - {}", controller.interval_description())),
        Line::from(format!(" - {}", controller.filters_description())),
    ];
    f.render_widget(
        Paragraph::new(lines).style(Style::default().fg(crate::palette::gray())),
        area,
    );
}

fn draw_entries<P: LogProvider>(f: &mut Frame, app: &mut App<P>, area: Rect) {
    // Borders plus header row
    let visible_lines = area.height.saturating_sub(3) as usize;
    let offset = app.scroll(visible_lines);
    let app = &*app;
    let controller = app.controller();

    let rows = controller.visible().skip(offset).take(visible_lines).collect();
    let empty_text = if controller.filter_error().is_some() {
        "Search text is not a valid pattern"
    } else if controller.store().is_empty() {
        "No journal entries"
    } else {
        "No entries match the search text"
    };

    let table = EntriesTable {
        rows,
        offset,
        selected: app.selected(),
        title: format!(
            " Entries{} ",
            if app.is_following() { " [follow]" } else { "" }
        ),
        empty_text,
    };
    f.render_widget(table, area);
}

fn draw_status<P: LogProvider>(f: &mut Frame, app: &App<P>, area: Rect) {
    let status = if app.is_busy() {
        Status::Busy
    } else if let Some(msg) = app.error_message() {
        Status::Error(msg)
    } else if app.is_editing_search() {
        Status::Info("Enter: keep search  Esc: restore")
    } else {
        Status::Idle
    };
    f.render_widget(StatusBar { status }, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
