use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::{
    api::dtos::todo::CreateTodoDTO,
    config::REFRESH_INTERVAL,
    models::{
        todo_model::{self, DueStatus, Priority, Todo},
        user_model::SlimUser,
    },
    sync::{ApiClient, RemoteEvent, SyncSession, Watcher},
    ui::app::{ActiveBlock, App, InputMode, Pane},
};

/// Opens the live board for `user` and blocks until it is closed
pub fn render_todo_board(client: ApiClient, user: SlimUser) -> anyhow::Result<()> {
    let watcher = Watcher::spawn(client.clone(), *REFRESH_INTERVAL);
    let app = App::new(SyncSession::start(user));

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();

    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(250);
    let res = run_app(&mut terminal, app, &client, &watcher, tick_rate);

    // restore terminal
    disable_raw_mode()?;

    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    terminal.show_cursor()?;
    watcher.stop();

    match res {
        Ok(app) => {
            app.session.end();
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Space: flip locally, then ask the server; put the old version back if it refuses
fn toggle_selected(app: &mut App, client: &ApiClient) {
    let id = match app.selected_todo() {
        Some(todo) => todo.id,
        None => return,
    };

    let previous = match app.session.optimistic_toggle(id) {
        Some(previous) => previous,
        None => return,
    };
    app.sync_lists();

    match client.toggle_todo(id) {
        Ok(todo) => {
            app.session.apply(RemoteEvent::Updated(todo));
        }
        Err(e) => {
            log::debug!("Toggle of {} rejected: {}", id, e);
            app.session.restore(previous);
            app.handle_error(format!("Could not toggle todo: {}", e));
        }
    }

    app.sync_lists();
}

fn delete_selected(app: &mut App, client: &ApiClient) {
    let id = match app.selected_todo() {
        Some(todo) => todo.id,
        None => return,
    };

    let user_id = app.session.user().id;
    let owned = app
        .session
        .get(id)
        .map_or(false, |todo| todo.is_owned_by(user_id));

    if !owned {
        app.handle_error(String::from("Only your own todos can be deleted"));
        return;
    }

    match client.delete_todo(id) {
        Ok(_) => {
            app.session.apply(RemoteEvent::Deleted(id));
            app.sync_lists();
            app.handle_new_message(String::from("Todo Item Deleted"));
        }
        Err(e) => app.handle_error(format!("Could not delete {}: {}", id, e)),
    }
}

fn create_from_input(app: &mut App, client: &ApiClient) {
    let is_team_todo = app.pending_team;
    let text = app.finish_new_todo();

    let text = match todo_model::normalize_text(&text) {
        Ok(text) => text,
        Err(e) => return app.handle_error(e),
    };

    let draft = CreateTodoDTO {
        text,
        is_team_todo: Some(is_team_todo),
        ..Default::default()
    };

    match client.create_todo(&draft) {
        Ok(todo) => {
            app.session.apply(RemoteEvent::Created(todo));
            app.sync_lists();
        }
        Err(e) => app.handle_error(e.to_string()),
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    client: &ApiClient,
    watcher: &Watcher,
    tick_rate: Duration,
) -> std::io::Result<App> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match app.input_mode {
                    InputMode::None => match key.code {
                        KeyCode::Esc => match app.get_current_route().active_block {
                            ActiveBlock::Error | ActiveBlock::Message => {
                                app.pop_navigation_stack();
                            }
                            _ => {}
                        },
                        KeyCode::Char('q') => return Ok(app),
                        KeyCode::Tab => app.toggle_focus(),
                        KeyCode::Left => app.focused_list_mut().unselect(),
                        KeyCode::Down => app.focused_list_mut().next(),
                        KeyCode::Up => app.focused_list_mut().previous(),
                        KeyCode::Char(' ') => toggle_selected(&mut app, client),
                        KeyCode::Char('x') => delete_selected(&mut app, client),
                        KeyCode::Char(c @ ('a' | 't')) => {
                            if app.get_current_route().active_block == ActiveBlock::Home {
                                app.start_new_todo(c == 't');
                            }
                        }
                        _ => {}
                    },
                    InputMode::Editing => match key.code {
                        KeyCode::Char(c) => {
                            if app.input_text.chars().count() < todo_model::MAX_TEXT_LEN {
                                app.input_text.push(c);
                            }
                        }
                        KeyCode::Backspace => {
                            app.input_text.pop();
                        }
                        KeyCode::Esc => {
                            app.finish_new_todo();
                        }
                        KeyCode::Enter => create_from_input(&mut app, client),
                        _ => {}
                    },
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let outcome = watcher.drain_into(&mut app.session);

            if outcome.changed {
                app.sync_lists();
            }

            if let Some(notice) = outcome.notices.into_iter().last() {
                app.status = notice;
            }

            last_tick = Instant::now();
        }
    }
}

/// Second line of a board entry: owner, due status and who last completed it
fn describe(todo: &Todo, now: NaiveDateTime) -> String {
    let mut parts = vec![format!("by {}", todo.owner_name)];

    if todo.is_team_todo {
        parts.push(String::from("team"));
    }

    if let Some(status) = todo.due_status(now) {
        parts.push(status.label().to_string());
    }

    if let (Some(who), Some(at)) = (&todo.last_completed_by, todo.last_completed_at) {
        parts.push(format!(
            "last completed by {} at {}",
            who,
            at.format("%Y-%m-%d %H:%M")
        ));
    }

    parts.join(" · ")
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Normal => Color::White,
        Priority::Low => Color::DarkGray,
    }
}

fn todo_item(todo: &Todo, now: NaiveDateTime) -> ListItem<'static> {
    let mark = if todo.completed { "[x] " } else { "[ ] " };

    let mut title_style = Style::default().fg(priority_color(todo.priority));
    if todo.completed {
        title_style = title_style.add_modifier(Modifier::CROSSED_OUT);
    }

    let meta_color = match todo.due_status(now) {
        Some(DueStatus::Overdue) => Color::LightRed,
        Some(DueStatus::DueSoon) => Color::Yellow,
        _ => Color::Gray,
    };

    ListItem::new(vec![
        Spans::from(vec![
            Span::raw(mark),
            Span::styled(todo.text.clone(), title_style),
        ]),
        Spans::from(Span::styled(
            format!("    {}", describe(todo, now)),
            Style::default().fg(meta_color),
        )),
    ])
}

fn draw_pane<B: Backend>(f: &mut Frame<B>, app: &mut App, pane: Pane, area: Rect) {
    let now = todo_model::now();
    let focused = app.focus == pane;

    let (title, list) = match pane {
        Pane::Mine => ("Mine", &mut app.mine),
        Pane::Team => ("Team", &mut app.team),
    };

    let items: Vec<ListItem> = list.items.iter().map(|todo| todo_item(todo, now)).collect();

    let border = if focused {
        Style::default().fg(Color::LightCyan)
    } else {
        Style::default()
    };

    let items = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("{} ({})", title, list.items.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol(">> ");

    f.render_stateful_widget(items, area, &mut list.state);
}

fn draw_home_content<B: Backend>(f: &mut Frame<B>, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(f.size());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[0]);

    draw_pane(f, app, Pane::Mine, panes[0]);
    draw_pane(f, app, Pane::Team, panes[1]);

    let help = Spans::from(vec![
        Span::styled(
            app.session.user().name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {} todos", app.session.todos().len())),
        Span::raw("  space toggle · a add · t add team · x delete · tab switch · q quit  "),
        Span::styled(app.status.clone(), Style::default().fg(Color::Yellow)),
    ]);

    f.render_widget(
        Paragraph::new(help).block(Block::default().borders(Borders::ALL)),
        rows[1],
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

fn draw_popup<B: Backend>(f: &mut Frame<B>, title: &str, body: &str, color: Color) {
    let area = centered_rect(60, 30, f.size());

    let text = vec![Spans::from(Span::styled(
        body.to_string(),
        Style::default().fg(color),
    ))];

    let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!("{} (Esc to close)", title),
                Style::default().fg(color),
            ))
            .border_style(Style::default().fg(color)),
    );

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn draw_new_todo_content<B: Backend>(f: &mut Frame<B>, app: &App) {
    let area = centered_rect(60, 30, f.size());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(3)].as_ref())
        .split(area);

    let target = if app.pending_team { "team" } else { "personal" };

    let prompt_message = vec![
        Span::raw(format!("New {} todo. Press ", target)),
        Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to cancel, "),
        Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to add it"),
    ];

    let input = Paragraph::new(app.input_text.as_ref())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Input {}/{}",
            app.input_text.chars().count(),
            todo_model::MAX_TEXT_LEN
        )));

    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(Text::from(Spans::from(prompt_message))), chunks[0]);
    f.render_widget(input, chunks[1]);
}

fn ui<B: Backend>(f: &mut Frame<B>, app: &mut App) {
    draw_home_content(f, app);

    match app.get_current_route().active_block {
        ActiveBlock::Home => {}
        ActiveBlock::Message => draw_popup(f, "Message", &app.message, Color::LightBlue),
        ActiveBlock::Error => draw_popup(f, "Error", &app.error_message, Color::LightRed),
        ActiveBlock::NewTodo => draw_new_todo_content(f, app),
    }
}
