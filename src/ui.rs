use crate::app::{update, AppMsg, Effect};
use crate::deck_core::forms::FormStore;
use crate::deck_core::panels::PanelRegistry;
use crate::model::{AppConfig, WorkflowView};
use crate::nav::flatten::{flatten_nodes, FlatNode};
use crate::services::backend::{
    expand_env, spawn_dispatch_action, spawn_load_view, spawn_sync_panel_state, BackendClient,
};
use crate::widgets::chrome::panel_block;
use crate::widgets::diff_viewer::DiffViewer;
use crate::widgets::form::{draw_form, FormState, RowValue};
use crate::widgets::form_widget::{self, FormSignal, TextAreaOverlay};
use crate::widgets::header::draw_header;
use crate::widgets::json_viewer::ResponseViewer;
use crate::widgets::status_bar::draw_footer_combined;
use crate::widgets::steps::draw_steps;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

/// Completions from the backend worker threads.
pub(crate) enum NetMsg {
    View(Result<WorkflowView, String>),
    Dispatch {
        euid: String,
        action: String,
        outcome: Result<JsonValue, String>,
    },
    PanelSync {
        step_euid: String,
        outcome: Result<JsonValue, String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum PaneFocus {
    #[default]
    Steps,
    Detail,
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) workflow_euid: String,
    pub(crate) view: Option<WorkflowView>,
    pub(crate) forms: FormStore,
    pub(crate) panels: PanelRegistry,
    pub(crate) active_form_key: Option<String>,
    pub(crate) diff: Option<DiffViewer>,
    pub(crate) response: Option<ResponseViewer>,
    pub(crate) overlay: Option<TextAreaOverlay>,
    pub(crate) selected: usize,
    pub(crate) tree_offset: usize,
    pub(crate) tree_viewport_h: u16,
    pub(crate) focus: PaneFocus,
    pub(crate) loading: bool,
    pub(crate) submitting: bool,
    pub(crate) boot_load_done: bool,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) last_error: Option<String>,
    pub(crate) pending_reload: Option<Instant>,
    pub(crate) tick: u64,
    pub(crate) theme: crate::theme::Theme,
    // Debug log (rendered in bottom debug pane)
    pub(crate) debug_log: VecDeque<String>,
    tx: Option<Sender<NetMsg>>,
    rx: Option<Receiver<NetMsg>>,
    pub(crate) client: Option<BackendClient>,
}

impl AppState {
    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }

    /// The form currently shown in the detail pane, if any.
    pub(crate) fn active_form(&self) -> Option<&FormState> {
        self.active_form_key
            .as_ref()
            .and_then(|k| self.forms.get(k))
            .filter(|f| f.visible)
    }
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::DispatchAction { request } => {
                state.dbg(format!(
                    "dispatch {} for {} ({})",
                    request.action, request.euid, request.action_group
                ));
                state.submitting = true;
                state.status_text = Some(format!("Running: {}", request.action));
                if let (Some(client), Some(tx)) = (state.client.clone(), state.tx.clone()) {
                    spawn_dispatch_action(client, request, tx);
                }
            }
            Effect::SyncPanelState { request } => {
                state.dbg(format!(
                    "persist panel {} -> {}",
                    request.step_euid, request.state
                ));
                if let (Some(client), Some(tx)) = (state.client.clone(), state.tx.clone()) {
                    spawn_sync_panel_state(client, request, tx);
                }
            }
            Effect::LoadView => {
                state.loading = true;
                if let (Some(client), Some(tx)) = (state.client.clone(), state.tx.clone()) {
                    spawn_load_view(client, state.workflow_euid.clone(), tx);
                }
            }
            Effect::ScheduleReload { delay_ms } => {
                let due = Instant::now() + Duration::from_millis(delay_ms);
                state.pending_reload = Some(match state.pending_reload {
                    Some(t) => t.min(due),
                    None => due,
                });
                state.dbg(format!("reload scheduled in {delay_ms}ms"));
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
        }
    }
}

fn pump_net(state: &mut AppState) {
    let mut drained: Vec<NetMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(m) = rx.try_recv() {
            drained.push(m);
        }
    }
    for m in drained {
        let msg = match m {
            NetMsg::View(outcome) => AppMsg::ViewLoaded { outcome },
            NetMsg::Dispatch {
                euid,
                action,
                outcome,
            } => AppMsg::DispatchDone {
                euid,
                action,
                outcome,
            },
            NetMsg::PanelSync { step_euid, outcome } => AppMsg::PanelSynced { step_euid, outcome },
        };
        let effects = update(state, msg);
        run_effects(state, effects);
    }
}

fn fire_due_reload(state: &mut AppState) {
    if let Some(due) = state.pending_reload {
        if Instant::now() >= due {
            state.pending_reload = None;
            let effects = update(state, AppMsg::ReloadDue);
            run_effects(state, effects);
        }
    }
}

pub fn run() -> Result<()> {
    let cfg = crate::services::loader::load_config()?;
    let client = BackendClient::new(&cfg.backend_url);
    let workflow_euid = expand_env(&cfg.workflow_euid);
    let mut state = AppState {
        config: cfg,
        workflow_euid,
        client: Some(client),
        theme: crate::theme::Theme::bench_dark(),
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<NetMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);

    // Headless smoke mode
    let headless = std::env::var("FLOWDECK_HEADLESS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);
    let headless_ticks: u64 = std::env::var("FLOWDECK_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let headless_summary: bool = std::env::var("FLOWDECK_SMOKE_SUMMARY")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);
    if headless {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let tick_rate = Duration::from_millis(200);
        let mut last_tick = Instant::now();
        for _ in 0..headless_ticks {
            if !state.boot_load_done {
                state.boot_load_done = true;
                run_effects(&mut state, vec![Effect::LoadView]);
            }
            terminal.draw(|f| ui(f, &mut state))?;
            pump_net(&mut state);
            fire_due_reload(&mut state);
            if last_tick.elapsed() >= tick_rate {
                state.tick = state.tick.wrapping_add(1);
                last_tick = Instant::now();
            }
            std::thread::sleep(tick_rate);
        }
        if headless_summary {
            let summary = serde_json::json!({
                "ok": state.last_error.is_none(),
                "view_present": state.view.is_some(),
                "loading": state.loading,
                "forms_open": state.forms.len(),
                "reload_pending": state.pending_reload.is_some(),
            });
            println!("{summary}");
        }
        return Ok(());
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res = loop {
        if !state.boot_load_done {
            state.boot_load_done = true;
            run_effects(&mut state, vec![Effect::LoadView]);
        }
        terminal.draw(|f| ui(f, &mut state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut state, key) {
                    break Ok(());
                }
            }
        }
        pump_net(&mut state);
        fire_due_reload(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

/// Returns true when the app should quit.
fn handle_key(state: &mut AppState, key: KeyEvent) -> bool {
    // Modal editor swallows everything except save/cancel
    if state.overlay.is_some() {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            if let Some(ov) = state.overlay.take() {
                let text = ov.text();
                if let Some(form) = state.forms.get_mut(&ov.form_key) {
                    if let Some(row) = form.row_mut(&ov.row_key) {
                        row.value = RowValue::MultiLine(text);
                    }
                }
                state.dbg(format!("multiline value saved for {}", ov.row_key));
            }
        } else if key.code == KeyCode::Esc {
            state.overlay = None;
        } else if let Some(ov) = state.overlay.as_mut() {
            ov.input(key.code);
        }
        return false;
    }
    // Clipboard copy of the detail pane
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        if let Some(content) = detail_text(state) {
            if !content.is_empty() {
                if let Ok(mut clipboard) = arboard::Clipboard::new() {
                    let _ = clipboard.set_text(&content);
                    state.status_text = Some("Copied to clipboard!".to_string());
                }
            }
        }
        return false;
    }
    let form_editing = state.active_form().map(|f| f.editing).unwrap_or(false);
    match key.code {
        KeyCode::Char('q') if !form_editing => return true,
        KeyCode::Char('r') if !form_editing && matches!(state.focus, PaneFocus::Steps) => {
            let effects = update(state, AppMsg::ReloadDue);
            run_effects(state, effects);
        }
        KeyCode::Tab => {
            state.focus = match state.focus {
                PaneFocus::Steps => PaneFocus::Detail,
                PaneFocus::Detail => PaneFocus::Steps,
            };
        }
        _ => match state.focus {
            PaneFocus::Steps => handle_steps_key(state, key.code),
            PaneFocus::Detail => handle_detail_key(state, key.code),
        },
    }
    false
}

fn handle_steps_key(state: &mut AppState, code: KeyCode) {
    match code {
        KeyCode::Up => {
            let total = flatten_nodes(state).len();
            if total > 0 && state.selected > 0 {
                state.selected -= 1;
                if state.selected < state.tree_offset {
                    state.tree_offset = state.selected;
                }
            }
        }
        KeyCode::Down => {
            let total = flatten_nodes(state).len();
            if total > 0 && state.selected + 1 < total {
                state.selected += 1;
                let ih = state.tree_viewport_h as usize;
                if ih > 0 && state.selected >= state.tree_offset + ih {
                    state.tree_offset = state.selected.saturating_sub(ih.saturating_sub(1));
                }
            }
        }
        KeyCode::PageUp => {
            let step = state.tree_viewport_h as usize;
            if step > 0 {
                state.selected = state.selected.saturating_sub(step);
                state.tree_offset = state.tree_offset.saturating_sub(step);
            }
        }
        KeyCode::PageDown => {
            let step = state.tree_viewport_h as usize;
            let total = flatten_nodes(state).len();
            if step > 0 && total > 0 {
                state.selected = (state.selected + step).min(total - 1);
                let ih = state.tree_viewport_h as usize;
                if state.selected >= state.tree_offset + ih {
                    state.tree_offset = state.selected.saturating_sub(ih.saturating_sub(1));
                }
            }
        }
        KeyCode::Enter => {
            let msg = {
                let nodes = flatten_nodes(state);
                let Some(view) = &state.view else { return };
                match nodes.get(state.selected) {
                    Some(FlatNode::Step { step_idx }) => Some(AppMsg::TogglePanel {
                        step_euid: view.steps[*step_idx].euid.clone(),
                    }),
                    Some(FlatNode::Action {
                        step_idx,
                        group_idx,
                        action_idx,
                    }) => {
                        let step = &view.steps[*step_idx];
                        let group = &step.action_groups[*group_idx];
                        Some(AppMsg::ActivateAction {
                            step_euid: step.euid.clone(),
                            group: group.name.clone(),
                            action: group.actions[*action_idx].name.clone(),
                        })
                    }
                    Some(FlatNode::Audit { step_idx, row_idx }) => Some(AppMsg::ToggleDiff {
                        row_id: view.steps[*step_idx].audit[*row_idx].id.clone(),
                    }),
                    None => None,
                }
            };
            if let Some(msg) = msg {
                let effects = update(state, msg);
                run_effects(state, effects);
            }
        }
        _ => {}
    }
}

fn handle_detail_key(state: &mut AppState, code: KeyCode) {
    // A visible form takes the keys first
    if let Some(key) = state.active_form_key.clone() {
        let signal = state
            .forms
            .get_mut(&key)
            .filter(|f| f.visible)
            .map(|form| {
                let was_editing = form.editing;
                (form_widget::on_key(form, code), was_editing)
            });
        if let Some((signal, was_editing)) = signal {
            match signal {
                FormSignal::Submit => {
                    let effects = update(state, AppMsg::SubmitForm { key });
                    run_effects(state, effects);
                }
                FormSignal::Cancel => {
                    let effects = update(state, AppMsg::CancelForm { key });
                    run_effects(state, effects);
                }
                FormSignal::OpenEditor { row_key, text } => {
                    state.overlay = Some(TextAreaOverlay::open(key, row_key, &text));
                }
                FormSignal::AddEntry { row_key } => {
                    let effects = update(
                        state,
                        AppMsg::AddListEntry {
                            key,
                            field: row_key,
                        },
                    );
                    run_effects(state, effects);
                }
                FormSignal::RemoveEntry { row_key } => {
                    let effects = update(
                        state,
                        AppMsg::RemoveListEntry {
                            key,
                            field: row_key,
                        },
                    );
                    run_effects(state, effects);
                }
                FormSignal::None => {
                    // Esc first leaves edit mode; a second Esc leaves the pane.
                    if code == KeyCode::Esc && !was_editing {
                        state.focus = PaneFocus::Steps;
                    }
                }
            }
            return;
        }
    }
    if let Some(diff) = state.diff.as_mut() {
        if code == KeyCode::Esc {
            state.focus = PaneFocus::Steps;
        } else {
            diff.on_key(code);
        }
        return;
    }
    if let Some(resp) = state.response.as_mut() {
        if code == KeyCode::Esc {
            state.focus = PaneFocus::Steps;
        } else {
            resp.on_key(code);
        }
        return;
    }
    if code == KeyCode::Esc {
        state.focus = PaneFocus::Steps;
    }
}

fn detail_text(state: &AppState) -> Option<String> {
    if let Some(form) = state.active_form() {
        return Some(
            form.rows
                .iter()
                .map(|r| format!("{}: {:?}", r.key, r.value))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    if let Some(d) = &state.diff {
        if d.shown {
            return Some(format!(
                "--- before ---\n{}\n--- after ---\n{}",
                d.old_text, d.new_text
            ));
        }
    }
    state.response.as_ref().map(|r| {
        if r.text.is_empty() {
            r.error.clone().unwrap_or_default()
        } else {
            r.text.clone()
        }
    })
}

fn help_text(state: &AppState) -> String {
    if state.overlay.is_some() {
        return "Type  Enter newline  Ctrl+S save  Esc cancel".to_string();
    }
    match state.focus {
        PaneFocus::Detail => {
            if let Some(form) = state.active_form() {
                if form.editing {
                    "Type  Enter finish  Esc exit edit".to_string()
                } else {
                    "↑/↓ field  Enter edit  +/- list entry  Tab steps  q quit".to_string()
                }
            } else {
                "↑/↓ scroll  Esc back  Tab steps  q quit".to_string()
            }
        }
        PaneFocus::Steps => {
            "↑/↓ select  Enter open/toggle  r refresh  Tab detail  q quit".to_string()
        }
    }
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }

    let screen = f.area();
    let bg = Block::default().style(Style::default().bg(state.theme.bg));
    f.render_widget(bg, screen);

    const DEBUG_H: u16 = 4;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(DEBUG_H),
            Constraint::Length(1),
        ])
        .split(screen);

    draw_header(f, chunks[0], state);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);
    state.tree_viewport_h = main[0].height.saturating_sub(2);
    draw_steps(f, main[0], state);
    draw_detail(f, main[1], state);
    if let Some(ov) = &state.overlay {
        ov.render(f, chunks[1]);
    }

    draw_debug(f, chunks[2], state);
    let help = help_text(state);
    draw_footer_combined(f, chunks[3], state, &help);
}

fn draw_detail(f: &mut Frame, area: Rect, state: &mut AppState) {
    let focused = matches!(state.focus, PaneFocus::Detail);
    if let Some(key) = state.active_form_key.clone() {
        if let Some(form) = state.forms.get(&key) {
            if form.visible {
                let cursor_on = state.tick % 2 == 0;
                draw_form(f, area, form, focused, cursor_on);
                return;
            }
        }
    }
    if let Some(diff) = state.diff.as_mut() {
        diff.render(f, area, focused);
        return;
    }
    if let Some(resp) = state.response.as_mut() {
        resp.render(f, area, focused);
        return;
    }
    let p = Paragraph::new(
        "Enter on an action opens its form.\nEnter on a step header toggles the panel.",
    )
    .style(crate::theme::text_muted())
    .block(panel_block("Detail", focused));
    f.render_widget(p, area);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "Debug",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ));
    let h = area.height as usize;
    let mut lines: Vec<Line> = Vec::new();
    let total = state.debug_log.len();
    let start = total.saturating_sub(h);
    for s in state.debug_log.iter().skip(start) {
        lines.push(Line::raw(s.clone()));
    }
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
