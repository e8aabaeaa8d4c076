// SPDX-License-Identifier: MIT
// `taskd ui` ratatui terminal UI.
//
// Full-screen task manager over the daemon's JSON-RPC WebSocket:
//   - Form pane: create a task, or edit the one picked from the list
//   - List pane: paginated task list, fetching lazily as the selection
//     nears the end of the loaded items
//   - Delete requires a y/n confirmation
//
// All reads and mutations go through the client page cache, so the
// optimistic patch / rollback protocol is what drives the screen.

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::{SinkExt, StreamExt};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::client::cache::PageCache;
use crate::config::TaskdConfig;
use crate::tasks::{Page, Task, TaskPatch};

/// Page size for the list pane's paginated query.
const PAGE_LIMIT: usize = 5;

/// Which pane owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Title,
    Description,
    List,
}

/// What an outstanding RPC id is waiting for.
enum InFlight {
    Fetch { epoch: u64 },
    Create { mutation: u64 },
    Update { mutation: u64 },
    Delete,
}

/// ratatui-based interactive task manager.
pub struct TaskUi {
    config: TaskdConfig,
}

impl TaskUi {
    pub fn new(config: &TaskdConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Start the interactive TUI loop.
    pub async fn run(self) -> Result<()> {
        // Set up terminal.
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("create terminal")?;

        let result = self.event_loop(&mut terminal).await;

        // Restore terminal regardless of result.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let token = crate::auth::read_token(&self.config.data_dir)?;
        let url = format!("ws://127.0.0.1:{}", self.config.port);

        let (mut ws, _) =
            tokio::time::timeout(std::time::Duration::from_secs(5), connect_async(&url))
                .await
                .context("timed out connecting to daemon")?
                .context("failed to connect")?;

        crate::client::authenticate(&mut ws, &token).await?;

        let mut cache = PageCache::new(PAGE_LIMIT);
        let mut in_flight: HashMap<u64, InFlight> = HashMap::new();
        let mut rpc_id: u64 = 10;

        let mut focus = Focus::Title;
        let mut title_buf = String::new();
        let mut desc_buf = String::new();
        let mut editing: Option<Task> = None;
        let mut error: Option<String> = None;
        let mut selected: usize = 0;
        let mut confirm_delete: Option<String> = None;

        loop {
            let tasks = cache.tasks();
            if selected >= tasks.len() && !tasks.is_empty() {
                selected = tasks.len() - 1;
            }

            // Draw UI.
            terminal.draw(|f| {
                draw_ui(
                    f,
                    &tasks,
                    selected,
                    focus,
                    &title_buf,
                    &desc_buf,
                    editing.as_ref(),
                    error.as_deref(),
                    cache.in_flight() > 0,
                    confirm_delete.is_some(),
                    cache.has_more(),
                );
            })?;

            // Refetch-on-access: a committed mutation or an invalidation hint
            // marked the query stale.
            let fetching = in_flight
                .values()
                .any(|f| matches!(f, InFlight::Fetch { .. }));
            if cache.is_stale() && !fetching {
                cache.reset();
                rpc_id += 1;
                send_fetch(&mut ws, rpc_id, None).await?;
                in_flight.insert(
                    rpc_id,
                    InFlight::Fetch {
                        epoch: cache.begin_fetch(),
                    },
                );
            } else if !fetching && cache.has_more() && selected + 2 >= tasks.len() {
                // The selection is nearing the end of the loaded items —
                // request the next page (or the first, right after startup).
                rpc_id += 1;
                send_fetch(&mut ws, rpc_id, cache.next_cursor().map(str::to_owned)).await?;
                in_flight.insert(
                    rpc_id,
                    InFlight::Fetch {
                        epoch: cache.begin_fetch(),
                    },
                );
            }

            // Poll for terminal events (non-blocking, 50ms timeout).
            if event::poll(std::time::Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    // Delete confirmation intercepts everything.
                    if let Some(task_id) = confirm_delete.clone() {
                        match key.code {
                            KeyCode::Char('y') => {
                                rpc_id += 1;
                                ws.send(Message::Text(serde_json::to_string(&json!({
                                    "jsonrpc":"2.0","id":rpc_id,
                                    "method":"task.delete",
                                    "params":{"id":task_id}
                                }))?))
                                .await?;
                                in_flight.insert(rpc_id, InFlight::Delete);
                                confirm_delete = None;
                            }
                            KeyCode::Char('n') | KeyCode::Esc => confirm_delete = None,
                            _ => {}
                        }
                        continue;
                    }

                    match (key.code, key.modifiers) {
                        (KeyCode::Char('c'), KeyModifiers::CONTROL) => break,
                        (KeyCode::Tab, _) => {
                            focus = match focus {
                                Focus::Title => Focus::Description,
                                Focus::Description => Focus::List,
                                Focus::List => Focus::Title,
                            };
                        }
                        (KeyCode::Esc, _) => {
                            if editing.is_some() {
                                editing = None;
                                title_buf.clear();
                                desc_buf.clear();
                                error = None;
                            } else {
                                break;
                            }
                        }
                        (KeyCode::Enter, _) if focus != Focus::List => {
                            // Submission is disabled while a mutation is in
                            // flight; an empty trimmed title never leaves the
                            // client.
                            if cache.in_flight() > 0 {
                                continue;
                            }
                            if title_buf.trim().is_empty() {
                                error = Some("Title is required".to_owned());
                                continue;
                            }

                            let description = if desc_buf.is_empty() {
                                None
                            } else {
                                Some(desc_buf.clone())
                            };

                            rpc_id += 1;
                            match &editing {
                                Some(task) => {
                                    let mutation = cache.begin_update(
                                        &task.id,
                                        &TaskPatch {
                                            title: Some(title_buf.clone()),
                                            description: description.clone(),
                                        },
                                    );
                                    ws.send(Message::Text(serde_json::to_string(&json!({
                                        "jsonrpc":"2.0","id":rpc_id,
                                        "method":"task.update",
                                        "params":{
                                            "id":task.id,
                                            "title":title_buf,
                                            "description":description
                                        }
                                    }))?))
                                    .await?;
                                    in_flight.insert(rpc_id, InFlight::Update { mutation });
                                }
                                None => {
                                    let mutation =
                                        cache.begin_create(&title_buf, description.as_deref());
                                    ws.send(Message::Text(serde_json::to_string(&json!({
                                        "jsonrpc":"2.0","id":rpc_id,
                                        "method":"task.create",
                                        "params":{
                                            "title":title_buf,
                                            "description":description
                                        }
                                    }))?))
                                    .await?;
                                    in_flight.insert(rpc_id, InFlight::Create { mutation });
                                }
                            }
                        }
                        (KeyCode::Backspace, _) => match focus {
                            Focus::Title => {
                                title_buf.pop();
                            }
                            Focus::Description => {
                                desc_buf.pop();
                            }
                            Focus::List => {}
                        },
                        (KeyCode::Up, _) if focus == Focus::List => {
                            selected = selected.saturating_sub(1);
                        }
                        (KeyCode::Down, _) if focus == Focus::List => {
                            if selected + 1 < tasks.len() {
                                selected += 1;
                            }
                        }
                        (KeyCode::Char('e'), _) if focus == Focus::List => {
                            if let Some(task) = tasks.get(selected) {
                                title_buf = task.title.clone();
                                desc_buf = task.description.clone().unwrap_or_default();
                                editing = Some(task.clone());
                                error = None;
                                focus = Focus::Title;
                            }
                        }
                        (KeyCode::Char('d'), _) if focus == Focus::List => {
                            if let Some(task) = tasks.get(selected) {
                                confirm_delete = Some(task.id.clone());
                            }
                        }
                        (KeyCode::Char('r'), _) if focus == Focus::List => {
                            cache.mark_stale();
                        }
                        (KeyCode::Char(c), _) if focus != Focus::List => match focus {
                            Focus::Title => title_buf.push(c),
                            Focus::Description => desc_buf.push(c),
                            Focus::List => {}
                        },
                        _ => {}
                    }
                }
            }

            // Poll for WebSocket messages (non-blocking).
            if let Ok(Some(Ok(Message::Text(text)))) =
                tokio::time::timeout(std::time::Duration::from_millis(5), ws.next()).await
            {
                if let Ok(v) = serde_json::from_str::<Value>(&text) {
                    match v.get("id").and_then(|x| x.as_u64()) {
                        Some(id) => {
                            let rpc_error = v
                                .get("error")
                                .and_then(|e| e.get("message"))
                                .and_then(Value::as_str)
                                .map(str::to_owned);

                            match in_flight.remove(&id) {
                                Some(InFlight::Fetch { epoch }) => match rpc_error {
                                    Some(msg) => error = Some(msg),
                                    None => {
                                        if let Ok(page) =
                                            serde_json::from_value::<Page>(v["result"].clone())
                                        {
                                            cache.complete_fetch(epoch, page);
                                        }
                                    }
                                },
                                Some(InFlight::Create { mutation }) => match rpc_error {
                                    Some(msg) => {
                                        cache.rollback(mutation);
                                        error = Some(msg);
                                    }
                                    None => {
                                        cache.commit(mutation);
                                        title_buf.clear();
                                        desc_buf.clear();
                                        error = None;
                                    }
                                },
                                Some(InFlight::Update { mutation }) => match rpc_error {
                                    Some(msg) => {
                                        cache.rollback(mutation);
                                        error = Some(msg);
                                    }
                                    None => {
                                        cache.commit(mutation);
                                        title_buf.clear();
                                        desc_buf.clear();
                                        editing = None;
                                        error = None;
                                    }
                                },
                                Some(InFlight::Delete) => match rpc_error {
                                    Some(msg) => error = Some(msg),
                                    None => cache.reset(),
                                },
                                None => {}
                            }
                        }
                        None => {
                            // Notification from another client — stale hint.
                            if let Some(method) = v.get("method").and_then(|m| m.as_str()) {
                                if method.starts_with("task.") {
                                    cache.mark_stale();
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

// ─── UI rendering ─────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    f: &mut ratatui::Frame,
    tasks: &[Task],
    selected: usize,
    focus: Focus,
    title: &str,
    description: &str,
    editing: Option<&Task>,
    error: Option<&str>,
    saving: bool,
    confirming_delete: bool,
    has_more: bool,
) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(6), // form
            Constraint::Min(3),    // task list
            Constraint::Length(1), // help line
        ])
        .split(area);

    render_header(f, chunks[0], tasks.len(), saving);
    render_form(f, chunks[1], focus, title, description, editing, error);
    render_list(f, chunks[2], tasks, selected, focus, has_more);
    render_help(f, chunks[3], focus, confirming_delete);
}

fn render_header(f: &mut ratatui::Frame, area: Rect, count: usize, saving: bool) {
    let indicator = if saving { "  saving…" } else { "" };
    let header = Paragraph::new(format!(" taskd  {count} task(s){indicator}"))
        .style(Style::default().bg(Color::Rgb(28, 28, 40)).fg(Color::White));
    f.render_widget(header, area);
}

fn render_form(
    f: &mut ratatui::Frame,
    area: Rect,
    focus: Focus,
    title: &str,
    description: &str,
    editing: Option<&Task>,
    error: Option<&str>,
) {
    let mode = if editing.is_some() {
        "Edit Task"
    } else {
        "Create Task"
    };

    let cursor = |focused: bool| if focused { "▌" } else { "" };
    let field_style = |focused: bool| {
        if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Title:       "),
            Span::styled(
                format!("{title}{}", cursor(focus == Focus::Title)),
                field_style(focus == Focus::Title),
            ),
        ]),
        Line::from(vec![
            Span::raw("Description: "),
            Span::styled(
                format!("{description}{}", cursor(focus == Focus::Description)),
                field_style(focus == Focus::Description),
            ),
        ]),
    ];

    if let Some(msg) = error {
        lines.push(Line::from(Span::styled(
            msg.to_owned(),
            Style::default().fg(Color::Red),
        )));
    }

    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(mode));
    f.render_widget(form, area);
}

fn render_list(
    f: &mut ratatui::Frame,
    area: Rect,
    tasks: &[Task],
    selected: usize,
    focus: Focus,
    has_more: bool,
) {
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .flat_map(|(i, task)| {
            let marker = if i == selected && focus == Focus::List {
                "▸ "
            } else {
                "  "
            };
            let title_style = if i == selected && focus == Focus::List {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };

            let mut lines = vec![Line::from(Span::styled(
                format!("{marker}{}", task.title),
                title_style,
            ))];

            match &task.description {
                Some(d) if !d.is_empty() => lines.push(Line::from(format!("    {d}"))),
                _ => lines.push(Line::from(Span::styled(
                    "    No description provided",
                    Style::default().fg(Color::DarkGray),
                ))),
            }

            let mut meta = format!("    Created: {}", task.created_at.format("%Y-%m-%d %H:%M"));
            if let Some(updated) = task.updated_at {
                meta.push_str(&format!("   Updated: {}", updated.format("%Y-%m-%d %H:%M")));
            }
            lines.push(Line::from(Span::styled(
                meta,
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::from(""));

            lines.into_iter().map(ListItem::new).collect::<Vec<_>>()
        })
        .collect();

    let footer = if has_more {
        " Tasks (more…) "
    } else {
        " Tasks "
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(footer))
        .style(Style::default().fg(Color::White));

    f.render_widget(list, area);
}

fn render_help(f: &mut ratatui::Frame, area: Rect, focus: Focus, confirming_delete: bool) {
    let text = if confirming_delete {
        " Are you sure you want to delete this task?  y: delete  |  n: keep"
    } else if focus == Focus::List {
        " ↑/↓: select  |  e: edit  |  d: delete  |  r: refresh  |  Tab: form  |  Esc: quit"
    } else {
        " Enter: save  |  Tab: next field  |  Esc: cancel edit / quit"
    };
    let style = if confirming_delete {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

async fn send_fetch(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    rpc_id: u64,
    cursor: Option<String>,
) -> Result<()> {
    ws.send(Message::Text(serde_json::to_string(&json!({
        "jsonrpc": "2.0",
        "id": rpc_id,
        "method": "task.getPaginated",
        "params": { "limit": PAGE_LIMIT, "cursor": cursor }
    }))?))
    .await?;
    Ok(())
}
