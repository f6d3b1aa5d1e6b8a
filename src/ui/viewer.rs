use eframe::egui::*;
use humansize::DECIMAL;

use crate::ai::assist::{ChatRole, ChatTurn, PaneKind, PaneOutput};
use crate::ai::prompts;
use crate::ImageHit;

/// Deferred viewer interactions; executed after the window closure releases
/// its borrow of the app.
enum ViewerCmd {
    Story,
    Analysis,
    Chat(String),
}

impl crate::app::ImageScoutApp {
    /// Modal viewer over the selected card: the image, its details, and the
    /// three assistant panes.
    pub fn viewer(&mut self, ctx: &Context) {
        let Some(hit) = self.viewer_hit.clone() else {
            return;
        };
        let mut open = true;
        let mut cmd: Option<ViewerCmd> = None;
        Window::new(hit.title.clone())
            .id(Id::new("image-viewer"))
            .open(&mut open)
            .collapsible(false)
            .default_size([860.0, 560.0])
            .show(ctx, |ui| {
                self.viewer_contents(ui, &hit, &mut cmd);
            });
        if !open {
            // Closing the viewer discards the selection and its cached
            // encoding; any in-flight generation goes stale by epoch.
            self.close_viewer();
            return;
        }
        match cmd {
            Some(ViewerCmd::Story) => {
                let prompt = prompts::story_prompt(&hit.title, &self.assist.genre);
                self.run_assist(PaneKind::Story, prompt, true);
            }
            Some(ViewerCmd::Analysis) => {
                let prompt = prompts::analysis_prompt(&hit.title);
                self.run_assist(PaneKind::Analysis, prompt, false);
            }
            Some(ViewerCmd::Chat(text)) => {
                self.assist.transcript.push(ChatTurn {
                    role: ChatRole::User,
                    text,
                });
                let prompt = prompts::chat_prompt(&hit.title, &self.assist.transcript);
                self.run_assist(PaneKind::Chat, prompt, true);
            }
            None => {}
        }
    }

    fn viewer_contents(&mut self, ui: &mut Ui, hit: &ImageHit, cmd: &mut Option<ViewerCmd>) {
        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                ui.set_width(ui.available_width() * 0.5);
                ui.add(
                    Image::new(hit.url.as_str())
                        .show_loading_spinner(true)
                        .max_size(vec2(ui.available_width(), 420.0)),
                );
                details_strip(ui, hit);
            });
            ui.separator();
            ui.vertical(|ui| {
                self.assist_panes(ui, cmd);
            });
        });
    }

    fn assist_panes(&mut self, ui: &mut Ui, cmd: &mut Option<ViewerCmd>) {
        ui.horizontal(|ui| {
            for (pane, label) in [
                (PaneKind::Story, "Story"),
                (PaneKind::Analysis, "Analysis"),
                (PaneKind::Chat, "Chat"),
            ] {
                if ui
                    .selectable_label(self.active_pane == pane, label)
                    .clicked()
                {
                    self.active_pane = pane;
                }
            }
        });
        ui.separator();

        match self.active_pane {
            PaneKind::Story => {
                ui.horizontal(|ui| {
                    ComboBox::new("story-genre-select", "Genre")
                        .selected_text(self.assist.genre.clone())
                        .show_ui(ui, |ui| {
                            for genre in prompts::GENRES.iter() {
                                ui.selectable_value(
                                    &mut self.assist.genre,
                                    genre.to_string(),
                                    *genre,
                                );
                            }
                        });
                    if ui.button("Generate story").clicked() {
                        *cmd = Some(ViewerCmd::Story);
                    }
                });
                pane_output(ui, "story-output", &self.assist.story, "The story appears here.");
            }
            PaneKind::Analysis => {
                if ui.button("Analyze image").clicked() {
                    *cmd = Some(ViewerCmd::Analysis);
                }
                pane_output(
                    ui,
                    "analysis-output",
                    &self.assist.analysis,
                    "The analysis appears here.",
                );
            }
            PaneKind::Chat => {
                ScrollArea::vertical()
                    .id_salt("chat-transcript")
                    .max_height((ui.available_height() - 60.0).max(60.0))
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for turn in &self.assist.transcript {
                            match turn.role {
                                ChatRole::User => {
                                    ui.label(RichText::new(format!("You: {}", turn.text)).strong());
                                }
                                ChatRole::Assistant => {
                                    ui.label(&turn.text);
                                }
                            }
                        }
                        if self.assist.chat.streaming && !self.assist.chat.text.is_empty() {
                            ui.label(&self.assist.chat.text);
                        }
                        if let Some(err) = &self.assist.chat.error {
                            ui.colored_label(ui.style().visuals.error_fg_color, err);
                        }
                        if self.assist.transcript.is_empty() && !self.assist.chat.streaming {
                            ui.weak("Ask anything about this image.");
                        }
                    });
                ui.horizontal(|ui| {
                    let resp = ui.add_sized(
                        [ui.available_width() - 60.0, 20.0],
                        TextEdit::singleline(&mut self.assist.chat_input)
                            .hint_text("Ask about this image..."),
                    );
                    let submitted =
                        resp.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
                    if (ui.button("Send").clicked() || submitted)
                        && !self.assist.chat_input.trim().is_empty()
                    {
                        *cmd = Some(ViewerCmd::Chat(self.assist.chat_input.trim().to_string()));
                        self.assist.chat_input.clear();
                    }
                });
                if !self.assist.transcript.is_empty() {
                    ui.horizontal(|ui| {
                        if ui.button("Clear chat").clicked() {
                            self.assist.transcript.clear();
                            self.assist.chat = PaneOutput::default();
                        }
                        if ui.button("Copy").clicked() {
                            let text = self
                                .assist
                                .transcript
                                .iter()
                                .map(|t| match t.role {
                                    ChatRole::User => format!("You: {}", t.text),
                                    ChatRole::Assistant => t.text.clone(),
                                })
                                .collect::<Vec<_>>()
                                .join("\n");
                            ui.ctx().copy_text(text);
                        }
                    });
                }
            }
        }
    }
}

fn pane_output(ui: &mut Ui, id: &str, out: &PaneOutput, placeholder: &str) {
    if out.streaming {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.weak("Generating...");
        });
    }
    ScrollArea::vertical()
        .id_salt(id)
        .max_height((ui.available_height() - 8.0).max(40.0))
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if let Some(err) = &out.error {
                ui.colored_label(ui.style().visuals.error_fg_color, err);
            } else if out.text.is_empty() && !out.streaming {
                ui.weak(placeholder);
            } else {
                ui.label(&out.text);
            }
        });
    if !out.text.is_empty() && !out.streaming {
        if ui.button("Copy").clicked() {
            ui.ctx().copy_text(out.text.clone());
        }
    }
}

fn details_strip(ui: &mut Ui, hit: &ImageHit) {
    ui.add_space(4.0);
    if let Some(artist) = &hit.artist {
        ui.label(format!("By {artist}"));
    }
    ui.horizontal_wrapped(|ui| {
        if let Some(license) = &hit.license {
            ui.weak(license);
        }
        if let Some(mime) = &hit.mime {
            ui.weak(mime);
        }
        if let Some(size) = hit.size_bytes {
            ui.weak(humansize::format_size(size, DECIMAL));
        }
        if let Some(uploaded) = &hit.uploaded {
            use chrono::Datelike;
            ui.weak(format!(
                "{}/{}/{}",
                uploaded.month(),
                uploaded.day(),
                uploaded.year()
            ));
        }
    });
    ui.hyperlink_to("Open original", &hit.url);
}
