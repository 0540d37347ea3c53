// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use holocron_app::{
    CollectionQuery, CollectionState, ConnectivityMonitor, DetailBody, DetailCommand,
    DetailController, DetailEvent, DetailOutcome, DetailState, DetailView, EntityUid,
    FetchOutcome, FetchToken, ListBody, ListCommand, ListController, ListEvent, ListView,
    NavigationIntent, ResourceKind, ScreenConfig, Subscription,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs, Wrap};
use std::collections::BTreeMap;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const SELECTION_MARK: &str = ">";

/// One detail fetch as handed to the runtime. `generation` identifies the
/// detail screen that asked for it; a screen opened later never accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub generation: u64,
    pub token: FetchToken,
    pub kind: ResourceKind,
    pub query: CollectionQuery,
    pub id: EntityUid,
}

pub trait CatalogRuntime {
    fn connectivity(&self) -> &ConnectivityMonitor;
    fn screen_config(&mut self, kind: ResourceKind) -> Result<ScreenConfig>;
    fn fetch_collection(&mut self, query: &CollectionQuery) -> FetchOutcome;
    fn fetch_detail(
        &mut self,
        kind: ResourceKind,
        query: &CollectionQuery,
        id: &EntityUid,
    ) -> DetailOutcome;
    fn spawn_collection_fetch(
        &mut self,
        kind: ResourceKind,
        token: FetchToken,
        query: CollectionQuery,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self.fetch_collection(&query);
        tx.send(InternalEvent::CollectionFetched {
            kind,
            token,
            outcome,
        })
        .map_err(|_| anyhow!("fetch event channel closed"))?;
        Ok(())
    }
    fn spawn_detail_fetch(
        &mut self,
        request: DetailRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self.fetch_detail(request.kind, &request.query, &request.id);
        tx.send(InternalEvent::DetailFetched {
            generation: request.generation,
            token: request.token,
            outcome,
        })
        .map_err(|_| anyhow!("fetch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Connectivity {
        kind: ResourceKind,
        online: bool,
    },
    CollectionFetched {
        kind: ResourceKind,
        token: FetchToken,
        outcome: FetchOutcome,
    },
    DetailFetched {
        generation: u64,
        token: FetchToken,
        outcome: DetailOutcome,
    },
}

#[derive(Debug)]
struct ScreenSlot {
    controller: ListController,
    subscription: Option<Subscription>,
    selected: usize,
}

#[derive(Debug)]
struct DetailSlot {
    generation: u64,
    controller: DetailController,
    query: CollectionQuery,
}

/// Everything the terminal shows: one list screen per visited tab and at
/// most one detail screen stacked on top.
#[derive(Debug)]
pub struct BrowserState {
    active: ResourceKind,
    screens: BTreeMap<ResourceKind, ScreenSlot>,
    detail: Option<DetailSlot>,
    detail_generation: u64,
    status_line: Option<String>,
    status_token: u64,
}

impl Default for BrowserState {
    fn default() -> Self {
        Self::new(ResourceKind::Planets)
    }
}

impl BrowserState {
    pub fn new(initial: ResourceKind) -> Self {
        Self {
            active: initial,
            screens: BTreeMap::new(),
            detail: None,
            detail_generation: 0,
            status_line: None,
            status_token: 0,
        }
    }

    pub fn active(&self) -> ResourceKind {
        self.active
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn list_view(&self, kind: ResourceKind) -> Option<ListView> {
        self.screens.get(&kind).map(|slot| slot.controller.view())
    }

    pub fn detail_view(&self) -> Option<DetailView> {
        self.detail.as_ref().map(|slot| slot.controller.view())
    }
}

pub fn run_app<R: CatalogRuntime>(state: &mut BrowserState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    activate_screen(state, runtime, &internal_tx, state.active);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    teardown_all(state, runtime);
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == state.status_token => {
                state.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Connectivity { kind, online } => {
                dispatch_list(state, runtime, tx, kind, ListCommand::ConnectivityChanged(online));
            }
            InternalEvent::CollectionFetched {
                kind,
                token,
                outcome,
            } => {
                dispatch_list(
                    state,
                    runtime,
                    tx,
                    kind,
                    ListCommand::FetchCompleted { token, outcome },
                );
            }
            InternalEvent::DetailFetched {
                generation,
                token,
                outcome,
            } => {
                let Some(slot) = state
                    .detail
                    .as_mut()
                    .filter(|slot| slot.generation == generation)
                else {
                    tracing::debug!(generation, %token, "detail result for a closed screen");
                    continue;
                };
                let events = slot
                    .controller
                    .dispatch(DetailCommand::FetchCompleted { token, outcome });
                apply_detail_events(state, runtime, tx, events);
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut BrowserState,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.status_line = Some(message.into());
    state.status_token = state.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, state.status_token);
}

/// Switches to `kind`, mounting its screen on the first visit. Visited
/// screens stay mounted until quit.
fn activate_screen<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    kind: ResourceKind,
) {
    state.active = kind;
    if state.screens.contains_key(&kind) {
        return;
    }

    let config = match runtime.screen_config(kind) {
        Ok(config) => config,
        Err(error) => {
            emit_status(state, tx, format!("load failed: {error:#}"));
            return;
        }
    };

    // The subscription's first delivery is the mount value; later ones are
    // transitions for the controller.
    let (initial_tx, initial_rx) = mpsc::channel();
    let mut initial_tx = Some(initial_tx);
    let sender = tx.clone();
    let subscription = runtime.connectivity().subscribe(move |online| {
        if let Some(initial) = initial_tx.take() {
            let _ = initial.send(online);
            return;
        }
        let _ = sender.send(InternalEvent::Connectivity { kind, online });
    });
    let online = initial_rx.try_recv().unwrap_or(true);
    state.screens.insert(
        kind,
        ScreenSlot {
            controller: ListController::new(config),
            subscription: Some(subscription),
            selected: 0,
        },
    );
    dispatch_list(state, runtime, tx, kind, ListCommand::Mount { online });
}

fn rotate_screen<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let kinds = ResourceKind::ALL;
    let current = kinds
        .iter()
        .position(|kind| *kind == state.active)
        .unwrap_or(0) as isize;
    let len = kinds.len() as isize;
    let next = (current + delta).rem_euclid(len) as usize;
    activate_screen(state, runtime, tx, kinds[next]);
}

fn dispatch_list<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    command: ListCommand,
) {
    let Some(slot) = state.screens.get_mut(&kind) else {
        return;
    };
    let events = slot.controller.dispatch(command);
    apply_list_events(state, runtime, tx, kind, events);
}

fn apply_list_events<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    events: Vec<ListEvent>,
) {
    for event in events {
        match event {
            ListEvent::FetchRequested { token, query } => {
                if let Err(error) = runtime.spawn_collection_fetch(kind, token, query, tx.clone()) {
                    emit_status(state, tx, format!("fetch failed to start: {error:#}"));
                }
            }
            ListEvent::CollectionChanged(CollectionState::Failed(failure)) => {
                if kind == state.active {
                    emit_status(state, tx, format!("{}: {failure}", kind.label()));
                }
            }
            ListEvent::CollectionChanged(_) | ListEvent::SearchChanged(_) => {
                clamp_selection(state, kind);
            }
            ListEvent::ConnectivityChanged(online) => {
                if kind == state.active {
                    emit_status(state, tx, if online { "back online" } else { "offline" });
                }
            }
            ListEvent::FetchAbandoned { .. } | ListEvent::ResultDiscarded { .. } => {}
            ListEvent::NavigationRequested(intent) => {
                open_detail(state, runtime, tx, kind, &intent);
            }
            ListEvent::Detached => {
                let subscription = state
                    .screens
                    .get_mut(&kind)
                    .and_then(|slot| slot.subscription.take());
                if let Some(subscription) = subscription {
                    runtime.connectivity().unsubscribe(subscription);
                }
            }
        }
    }
}

fn clamp_selection(state: &mut BrowserState, kind: ResourceKind) {
    if let Some(slot) = state.screens.get_mut(&kind) {
        let rows = slot.controller.filtered_view().len();
        slot.selected = slot.selected.min(rows.saturating_sub(1));
    }
}

fn open_detail<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    intent: &NavigationIntent,
) {
    let Some(query) = state
        .screens
        .get(&kind)
        .map(|slot| slot.controller.config().query.clone())
    else {
        return;
    };
    close_detail(state);

    let controller = match DetailController::from_intent(intent, query.clone()) {
        Ok(controller) => controller,
        Err(error) => {
            emit_status(state, tx, format!("cannot open detail: {error:#}"));
            return;
        }
    };
    state.detail_generation = state.detail_generation.saturating_add(1);
    let slot = state.detail.insert(DetailSlot {
        generation: state.detail_generation,
        controller,
        query,
    });
    let events = slot.controller.dispatch(DetailCommand::Mount);
    apply_detail_events(state, runtime, tx, events);
}

fn apply_detail_events<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    events: Vec<DetailEvent>,
) {
    for event in events {
        match event {
            DetailEvent::FetchRequested { token, kind, id, .. } => {
                let Some(slot) = state.detail.as_ref() else {
                    continue;
                };
                let request = DetailRequest {
                    generation: slot.generation,
                    token,
                    kind,
                    query: slot.query.clone(),
                    id,
                };
                if let Err(error) = runtime.spawn_detail_fetch(request, tx.clone()) {
                    emit_status(state, tx, format!("fetch failed to start: {error:#}"));
                }
            }
            DetailEvent::StateChanged(DetailState::Failed(failure)) => {
                emit_status(state, tx, format!("detail: {failure}"));
            }
            DetailEvent::StateChanged(_)
            | DetailEvent::ResultDiscarded { .. }
            | DetailEvent::Detached => {}
        }
    }
}

fn close_detail(state: &mut BrowserState) -> bool {
    let Some(mut slot) = state.detail.take() else {
        return false;
    };
    slot.controller.dispatch(DetailCommand::Teardown);
    true
}

fn teardown_all<R: CatalogRuntime>(state: &mut BrowserState, runtime: &mut R) {
    close_detail(state);
    let kinds = state.screens.keys().copied().collect::<Vec<_>>();
    // Nothing dispatched during teardown needs the channel.
    let (tx, _rx) = mpsc::channel();
    for kind in kinds {
        dispatch_list(state, runtime, &tx, kind, ListCommand::Teardown);
    }
}

fn handle_key_event<R: CatalogRuntime>(
    state: &mut BrowserState,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        teardown_all(state, runtime);
        return true;
    }

    if state.detail.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Left) {
            close_detail(state);
        }
        return false;
    }

    let active = state.active;
    match (key.code, key.modifiers) {
        (KeyCode::Tab, _) => rotate_screen(state, runtime, internal_tx, 1),
        (KeyCode::BackTab, _) => rotate_screen(state, runtime, internal_tx, -1),
        (KeyCode::Char('r'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            emit_status(state, internal_tx, format!("reloading {}", active.as_str()));
            dispatch_list(state, runtime, internal_tx, active, ListCommand::Remount);
        }
        (KeyCode::Up, _) => move_selection(state, -1),
        (KeyCode::Down, _) => move_selection(state, 1),
        (KeyCode::Right | KeyCode::Enter, _) => {
            if let Some(uid) = selected_uid(state) {
                dispatch_list(
                    state,
                    runtime,
                    internal_tx,
                    active,
                    ListCommand::SwipeOpen { uid },
                );
            }
        }
        (KeyCode::Backspace, _) => {
            if let Some(slot) = state.screens.get(&active) {
                let mut term = slot.controller.search_term().to_owned();
                term.pop();
                dispatch_list(
                    state,
                    runtime,
                    internal_tx,
                    active,
                    ListCommand::SetSearchTerm(term),
                );
            }
        }
        (KeyCode::Char(ch), modifiers)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            if let Some(slot) = state.screens.get(&active) {
                let mut term = slot.controller.search_term().to_owned();
                term.push(ch);
                dispatch_list(
                    state,
                    runtime,
                    internal_tx,
                    active,
                    ListCommand::SetSearchTerm(term),
                );
            }
        }
        _ => {}
    }
    false
}

fn move_selection(state: &mut BrowserState, delta: isize) {
    let Some(slot) = state.screens.get_mut(&state.active) else {
        return;
    };
    let rows = slot.controller.filtered_view().len();
    if rows == 0 {
        slot.selected = 0;
        return;
    }
    let next = (slot.selected as isize + delta).clamp(0, rows as isize - 1);
    slot.selected = next as usize;
}

fn selected_uid(state: &BrowserState) -> Option<EntityUid> {
    let slot = state.screens.get(&state.active)?;
    // Only rows on screen can be opened; offline and loading bodies have none.
    match slot.controller.view().body {
        ListBody::Rows(rows) => rows.into_iter().nth(slot.selected)?.uid,
        _ => None,
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &BrowserState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    match &state.detail {
        None => {
            let selected = ResourceKind::ALL
                .iter()
                .position(|kind| *kind == state.active)
                .unwrap_or(0);
            let titles = ResourceKind::ALL
                .iter()
                .map(|kind| format!(" {} ", kind.label()))
                .collect::<Vec<String>>();
            let tabs = Tabs::new(titles)
                .block(Block::default().title("holocron").borders(Borders::ALL))
                .style(Style::default().fg(Color::White))
                .highlight_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .select(selected);
            frame.render_widget(tabs, layout[0]);
        }
        Some(slot) => {
            let breadcrumb = Paragraph::new(format!(
                "{} > {}",
                slot.controller.kind().label(),
                slot.controller.view().title
            ))
            .block(Block::default().title("holocron").borders(Borders::ALL));
            frame.render_widget(breadcrumb, layout[0]);
        }
    }

    let (title, body) = match &state.detail {
        Some(slot) => ("detail", render_detail_text(&slot.controller.view())),
        None => match state.screens.get(&state.active) {
            Some(slot) => (
                state.active.as_str(),
                render_list_text(&slot.controller.view(), slot.selected),
            ),
            None => (state.active.as_str(), String::new()),
        },
    };
    let body = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(body, layout[1]);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);
}

fn render_list_text(view: &ListView, selected: usize) -> String {
    let mut lines = Vec::new();
    if let Some(banner) = &view.banner {
        lines.push(banner.clone());
    }
    if view.search_term.is_empty() {
        lines.push(view.placeholder.to_owned());
    } else {
        lines.push(format!("search: {}", view.search_term));
    }
    lines.push(String::new());

    match &view.body {
        ListBody::Unavailable { message }
        | ListBody::Failed { message }
        | ListBody::Empty { message } => lines.push(message.clone()),
        ListBody::Loading => lines.push(format!("Loading {}...", view.kind.as_str())),
        ListBody::Rows(rows) => {
            for (index, row) in rows.iter().enumerate() {
                let mark = if index == selected { SELECTION_MARK } else { " " };
                lines.push(format!("{mark} {}", row.title));
                lines.push(format!("    {}", row.subtitle));
            }
        }
    }
    lines.join("\n")
}

fn render_detail_text(view: &DetailView) -> String {
    let mut lines = vec![view.title.clone(), String::new()];
    match &view.body {
        DetailBody::Loading { message } | DetailBody::Failed { message } => {
            lines.push(message.clone());
        }
        DetailBody::Fields(fields) => {
            let width = fields
                .iter()
                .map(|field| field.label.chars().count())
                .max()
                .unwrap_or(0);
            lines.extend(
                fields
                    .iter()
                    .map(|field| format!("{:<width$}  {}", field.label, field.display_value())),
            );
        }
    }
    lines.join("\n")
}

fn status_text(state: &BrowserState) -> String {
    let online = state
        .screens
        .get(&state.active)
        .is_none_or(|slot| slot.controller.is_online());
    let badge = if online { "ONLINE" } else { "OFFLINE" };
    let hints = if state.detail.is_some() {
        "esc/left back | ctrl+q quit"
    } else {
        "tab/shift+tab screens | type to search | up/down | enter/right details | ctrl+r reload | ctrl+q quit"
    };
    match &state.status_line {
        Some(status) => format!("{badge} | {status} | {hints}"),
        None => format!("{badge} | {hints}"),
    }
}
