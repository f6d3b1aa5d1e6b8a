use eframe::egui::*;
use once_cell::sync::Lazy;
use std::sync::RwLock;

/// High-level lifecycle state for a backend component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusState {
    #[default]
    Idle,
    Running,
    Error,
}

impl StatusState {
    pub fn color(self, style: &Style) -> Color32 {
        match self {
            StatusState::Idle => style.visuals.weak_text_color(),
            StatusState::Running => style.visuals.warn_fg_color,
            StatusState::Error => style.visuals.error_fg_color,
        }
    }
}

/// Snapshot describing a component status.
#[derive(Debug, Clone, Default)]
pub struct StatusMeta {
    pub name: &'static str,
    pub detail: String,
    pub state: StatusState,
    pub error: Option<String>,
}

/// Trait for anything that can render itself as a compact indicator.
pub trait GlobalStatusIndicator {
    fn key(&self) -> &'static str;
    fn snapshot(&self) -> StatusMeta;
    fn set_state(&self, state: StatusState, detail: impl Into<String>);
    /// Set an error message and mark state as Error (shown in the hover card).
    fn set_error(&self, err: impl Into<String>);
}

static STATUSES: Lazy<RwLock<std::collections::HashMap<&'static str, StatusMeta>>> =
    Lazy::new(|| RwLock::new(Default::default()));

/// Handle for a registered global status.
#[derive(Clone)]
pub struct RegisteredStatus {
    key: &'static str,
}

impl RegisteredStatus {
    pub fn register(name: &'static str) -> Self {
        let mut w = STATUSES.write().unwrap();
        w.entry(name).or_insert_with(|| StatusMeta {
            name,
            ..Default::default()
        });
        Self { key: name }
    }
}

impl GlobalStatusIndicator for RegisteredStatus {
    fn key(&self) -> &'static str {
        self.key
    }

    fn snapshot(&self) -> StatusMeta {
        STATUSES
            .read()
            .unwrap()
            .get(self.key)
            .cloned()
            .unwrap_or_default()
    }

    fn set_state(&self, state: StatusState, detail: impl Into<String>) {
        if let Some(meta) = STATUSES.write().unwrap().get_mut(self.key) {
            meta.state = state;
            meta.detail = detail.into();
            if state != StatusState::Error {
                meta.error = None;
            }
        }
    }

    fn set_error(&self, err: impl Into<String>) {
        if let Some(meta) = STATUSES.write().unwrap().get_mut(self.key) {
            meta.state = StatusState::Error;
            meta.error = Some(err.into());
        }
    }
}

pub static SEARCH_STATUS: Lazy<RegisteredStatus> =
    Lazy::new(|| RegisteredStatus::register("SEARCH"));
pub static ASSIST_STATUS: Lazy<RegisteredStatus> =
    Lazy::new(|| RegisteredStatus::register("ASSIST"));

/// Compact dot + label, with detail/error in the hover card.
pub fn status_chip(ui: &mut Ui, status: &RegisteredStatus) {
    let meta = status.snapshot();
    let color = meta.state.color(ui.style());
    let resp = ui.colored_label(color, format!("● {}", meta.name));
    if !meta.detail.is_empty() || meta.error.is_some() {
        resp.on_hover_ui(|ui| {
            if !meta.detail.is_empty() {
                ui.label(&meta.detail);
            }
            if let Some(err) = &meta.error {
                ui.colored_label(ui.style().visuals.error_fg_color, err);
            }
        });
    }
}
