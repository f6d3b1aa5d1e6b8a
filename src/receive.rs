use eframe::egui::*;
use egui_toast::{Toast, ToastKind, ToastOptions};

use crate::search::SearchOutcome;
use crate::ui::status::{GlobalStatusIndicator, StatusState, ASSIST_STATUS, SEARCH_STATUS};

impl crate::app::ImageScoutApp {
    /// Per-frame pump: first-run setup, then drain every worker channel into
    /// controller state before the panels are drawn.
    pub fn receive(&mut self, ctx: &Context) {
        if self.first_run {
            egui_extras::install_image_loaders(ctx);
            self.first_run = false;
            if self.settings.api_key.is_none() {
                log::warn!("no AI API key in the environment; set one in Preferences");
                self.toast(
                    ToastKind::Warning,
                    "No AI API key found. Set one in Preferences to enable the assistant.",
                );
            }
        }

        while let Ok(outcome) = self.search_rx.try_recv() {
            ctx.request_repaint();
            if let SearchOutcome::Failed { error, .. } = &outcome {
                SEARCH_STATUS.set_error(error.clone());
            } else {
                SEARCH_STATUS.set_state(StatusState::Idle, "Idle");
            }
            self.pager.apply(outcome);
        }

        let (actions, processed) = self.assist.poll();
        if processed > 0 {
            ctx.request_repaint();
            if !self.assist.story.streaming
                && !self.assist.analysis.streaming
                && !self.assist.chat.streaming
            {
                ASSIST_STATUS.set_state(StatusState::Idle, "Idle");
            }
        }
        for action in actions {
            self.dispatch_assist(action);
        }

        while let Ok((kind, text)) = self.toast_rx.try_recv() {
            self.toasts.add(
                Toast::new()
                    .kind(kind)
                    .text(text)
                    .options(ToastOptions::default().duration_in_seconds(4.0)),
            );
        }
        self.toasts.show(ctx);

        self.settings_modal(ctx);

        if self.show_logs {
            ctx.show_viewport_immediate(
                ViewportId::from_hash_of("Logs Viewport"),
                ViewportBuilder::default().with_title("Logs"),
                |ctx, _| {
                    CentralPanel::default().show(ctx, |ui| {
                        egui_logger::logger_ui().show(ui);
                    });
                    if ctx.input(|i| i.viewport().close_requested()) {
                        self.show_logs = false;
                    }
                },
            );
        }
    }

    fn settings_modal(&mut self, ctx: &Context) {
        if !self.open_settings_modal {
            return;
        }
        if self.settings_draft.is_none() {
            self.settings_draft = Some(self.settings.clone());
        }
        let mut save = false;
        let mut close = false;
        Window::new("Preferences")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let draft = self.settings_draft.as_mut().unwrap();
                ui.horizontal(|ui| {
                    ui.label("Provider");
                    ComboBox::new("ai-provider-select", "")
                        .selected_text(draft.ai_provider.clone())
                        .show_ui(ui, |ui| {
                            for p in ["gemini", "openai", "grok", "groq", "openrouter", "custom"] {
                                ui.selectable_value(&mut draft.ai_provider, p.to_string(), p);
                            }
                        });
                });
                ui.horizontal(|ui| {
                    ui.label("Model");
                    ui.text_edit_singleline(&mut draft.model);
                });
                ui.horizontal(|ui| {
                    ui.label("API key");
                    let mut key = draft.api_key.clone().unwrap_or_default();
                    if ui.add(TextEdit::singleline(&mut key).password(true)).changed() {
                        draft.api_key = if key.is_empty() { None } else { Some(key) };
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Base URL");
                    let mut base = draft.base_url.clone().unwrap_or_default();
                    if ui
                        .add(TextEdit::singleline(&mut base).hint_text("override for custom"))
                        .changed()
                    {
                        draft.base_url = if base.is_empty() { None } else { Some(base) };
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Page size");
                    ui.add(DragValue::new(&mut draft.page_size).range(1..=50));
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button(RichText::new("Save").strong()).clicked() {
                        save = true;
                    }
                    if ui.button("Close").clicked() {
                        close = true;
                    }
                });
            });
        if save {
            self.settings = self.settings_draft.take().unwrap();
            self.pager.set_page_size(self.settings.page_size);
            self.open_settings_modal = false;
            log::info!("preferences updated (provider {})", self.settings.ai_provider);
        } else if close {
            self.settings_draft = None;
            self.open_settings_modal = false;
        }
    }
}
