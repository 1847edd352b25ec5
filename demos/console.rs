use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
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
use std::io;
use tokio::sync::broadcast;
use vmix_control::view::{self, InputRow, PlayToggleKind};
use vmix_control::{
    Command, CommandDispatcher, MixerClient, MixerConfig, Notification, NotificationLevel,
    StateReceiver,
};

struct App {
    client: MixerClient,
    dispatcher: CommandDispatcher,
    rows: Vec<InputRow>,
    dashboard: view::Dashboard,
    selected: usize,
    status: Option<Notification>,
    updates: StateReceiver,
    notifications: broadcast::Receiver<Notification>,
}

impl App {
    fn new(client: MixerClient) -> Self {
        let updates = client.subscribe_updates();
        let notifications = client.notifications();
        let dispatcher = client.dispatcher();

        Self {
            client,
            dispatcher,
            rows: Vec::new(),
            dashboard: view::dashboard(None),
            selected: 0,
            status: Some(Notification::info("Connecting to mixer...")),
            updates,
            notifications,
        }
    }

    fn select_next(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + 1) % self.rows.len();
        }
    }

    fn select_previous(&mut self) {
        if !self.rows.is_empty() {
            if self.selected == 0 {
                self.selected = self.rows.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    fn selected_row(&self) -> Option<&InputRow> {
        self.rows.get(self.selected)
    }

    /// Fire a command for the selected input without blocking the UI
    fn dispatch(&mut self, build: impl FnOnce(&InputRow) -> Option<Command>) {
        let Some(command) = self.selected_row().and_then(build) else {
            self.status = Some(Notification::info("Not available for this input"));
            return;
        };

        self.status = Some(Notification::info(format!("Sending {}...", command.label())));
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.execute(command).await;
        });
    }

    fn manual_refresh(&mut self) {
        self.status = Some(Notification::info("Refreshing..."));
        let refresher = self.client.refresher();
        tokio::spawn(async move {
            // Failures surface through notifications
            let _ = refresher.refresh().await;
        });
    }

    fn rebuild(&mut self) {
        let doc = self.client.current();
        self.rows = view::input_rows(doc.as_deref());
        self.dashboard = view::dashboard(doc.as_deref());
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn handle_state_update(&mut self) {
        match self.updates.try_recv() {
            Ok(Some(_)) => self.rebuild(),
            Ok(None) => {}
            Err(_) => {
                self.status = Some(Notification::error("State channel closed"));
            }
        }

        loop {
            match self.notifications.try_recv() {
                Ok(notification) => self.status = Some(notification),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        // Auto-dismiss
        if self.status.as_ref().is_some_and(Notification::is_expired) {
            self.status = None;
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    let inner_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(outer_chunks[1]);

    render_header(f, app, outer_chunks[0]);
    render_inputs(f, app, inner_chunks[0]);
    render_details(f, app, inner_chunks[1]);
    render_status(f, app, outer_chunks[2]);
}

fn flag(label: &str, on: bool) -> Span<'_> {
    Span::styled(
        format!(" {} ", label),
        if on {
            Style::default().fg(Color::Black).bg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        },
    )
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let dash = &app.dashboard;
    let block = Block::default()
        .title(format!(" vMix {} {} ", dash.edition, dash.version))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut spans = vec![
        Span::styled("Inputs: ", Style::default().fg(Color::Yellow)),
        Span::raw(format!("{} ({} running)  ", dash.total_inputs, dash.running_inputs)),
        flag("REC", dash.recording),
        Span::raw(" "),
        flag("STREAM", dash.streaming),
        Span::raw(" "),
        flag("EXT", dash.external),
    ];
    if let Some(master) = &dash.master {
        spans.push(Span::styled("  Master: ", Style::default().fg(Color::Yellow)));
        let volume = master
            .volume
            .map(|v| format!("{:.0}%", v))
            .unwrap_or_else(|| "-".to_string());
        spans.push(Span::raw(format!(
            "{}{}",
            volume,
            if master.muted { " (muted)" } else { "" }
        )));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_inputs(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Inputs (j/k select, p program, Q queue, r restart, space play, q quit) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    if app.rows.is_empty() {
        let text = Paragraph::new("Waiting for mixer state...")
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|row| {
            let tally = if row.program_active {
                Span::styled(" PGM ", Style::default().fg(Color::Black).bg(Color::Red))
            } else if row.preview_active {
                Span::styled(" PRV ", Style::default().fg(Color::Black).bg(Color::Green))
            } else {
                Span::raw("     ")
            };
            ListItem::new(Line::from(vec![
                tally,
                Span::raw(format!(" {:>3} ", row.number)),
                Span::styled(format!("{:<32}", row.title), Style::default().fg(Color::White)),
                Span::styled(
                    format!(" {}", row.kind),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.selected));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut state);
}

fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Input (m mute, 1-4 overlay, F5 refresh) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let Some(row) = app.selected_row() else {
        f.render_widget(Paragraph::new("No input selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Yellow);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Title: ", label.add_modifier(Modifier::BOLD)),
            Span::raw(&row.title),
        ]),
        Line::from(vec![
            Span::styled("State: ", label),
            Span::raw(format!("{:?}", row.state)),
        ]),
        Line::from(vec![
            Span::styled("Time: ", label),
            Span::raw(format!("{} / {}", row.position, row.duration)),
        ]),
        Line::from(""),
    ];

    let routes: Vec<Span> = row
        .mix_cells
        .iter()
        .flatten()
        .map(|route| {
            Span::styled(
                format!(" {} ", route.label),
                if route.active {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Gray)
                },
            )
        })
        .collect();
    if !routes.is_empty() {
        let mut spans = vec![Span::styled("Mixes: ", label)];
        spans.extend(routes);
        lines.push(Line::from(spans));
    }

    if let Some(toggle) = &row.play_toggle {
        let kind = match toggle.kind {
            PlayToggleKind::PlayPause => "clip",
            PlayToggleKind::LivePlayPause => "live",
        };
        lines.push(Line::from(vec![
            Span::styled("Playback: ", label),
            Span::raw(format!(
                "{} ({})",
                if toggle.paused { "paused" } else { "playing" },
                kind
            )),
        ]));
    }

    if let Some(audio) = &row.audio {
        let mut spans = vec![
            Span::styled("Audio: ", label),
            flag("MUTE", audio.muted),
            Span::raw(" "),
        ];
        for bus in &audio.buses {
            spans.push(Span::styled(
                format!(" {} ", bus.label),
                if bus.on {
                    Style::default().fg(Color::Black).bg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                },
            ));
        }
        if let Some(volume) = row.volume {
            spans.push(Span::raw(format!("  {:.0}%", volume)));
        }
        lines.push(Line::from(spans));
    }

    if let Some(overlays) = &row.overlays {
        let mut spans = vec![Span::styled("Overlays: ", label)];
        for (i, on) in overlays.iter().enumerate() {
            spans.push(flag(["1", "2", "3", "4"][i], *on));
        }
        lines.push(Line::from(spans));
    }

    if let Some(playlist) = &row.playlist {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Playlist:", label)));
        for entry in playlist {
            let prefix = if entry.selected { "  ▶ " } else { "    " };
            lines.push(Line::from(vec![
                Span::raw(prefix),
                Span::styled(
                    &entry.name,
                    if entry.selected {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    },
                ),
            ]));
        }
    }

    if let Some(countdown) = &row.countdown {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Countdown presets: ", label),
            Span::raw(
                countdown
                    .preset_minutes
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        ]));
    }

    let text = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(text, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let (message, color) = match &app.status {
        Some(notification) => (
            notification.message.clone(),
            match notification.level {
                NotificationLevel::Success => Color::Green,
                NotificationLevel::Info => Color::Gray,
                NotificationLevel::Error => Color::Red,
            },
        ),
        None => (String::new(), Color::DarkGray),
    };
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let text = Paragraph::new(message)
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(text, area);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs would corrupt the alternate screen, so send them to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MixerConfig::from_json_file(path)?,
        None => MixerConfig::from_env(),
    };
    let client = MixerClient::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client);
    let mut poller = app.client.start_polling();

    // Main loop
    let res = run_app(&mut terminal, &mut app).await;

    poller.stop().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        app.handle_state_update();

        // Handle input events (non-blocking)
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                    KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
                    KeyCode::Char('p') => app.dispatch(|row| {
                        Some(Command::SendToProgram {
                            input: row.key.clone(),
                        })
                    }),
                    KeyCode::Char('Q') => app.dispatch(|row| {
                        row.queue_play.then(|| Command::QueuePlay {
                            input: row.key.clone(),
                        })
                    }),
                    KeyCode::Char('r') => app.dispatch(|row| {
                        row.restart.then(|| Command::Restart {
                            input: row.key.clone(),
                        })
                    }),
                    KeyCode::Char('m') => app.dispatch(|row| {
                        row.audio.as_ref().map(|_| Command::ToggleAudio {
                            input: row.key.clone(),
                        })
                    }),
                    KeyCode::Char(' ') => app.dispatch(|row| {
                        row.play_toggle.as_ref().map(|toggle| match toggle.kind {
                            PlayToggleKind::PlayPause => Command::PlayPause {
                                input: row.key.clone(),
                            },
                            PlayToggleKind::LivePlayPause => Command::LivePlayPause {
                                input: row.key.clone(),
                            },
                        })
                    }),
                    KeyCode::Char(c @ '1'..='4') => {
                        let slot = c as u8 - b'0';
                        app.dispatch(|row| {
                            row.overlays.map(|_| Command::ToggleOverlay {
                                input: row.key.clone(),
                                slot,
                            })
                        })
                    }
                    KeyCode::F(5) => app.manual_refresh(),
                    _ => {}
                }
            }
        }
    }
}
