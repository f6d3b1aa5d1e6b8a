use eframe::egui::*;

use crate::ui::status::{status_chip, ASSIST_STATUS, SEARCH_STATUS};

impl crate::app::ImageScoutApp {
    pub fn navbar(&mut self, ctx: &Context) {
        TopBottomPanel::top("MainTopPanel")
            .exact_height(32.)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(RichText::new("Image Scout").strong());
                    ui.separator();

                    let resp = ui.add_sized(
                        [280.0, 20.0],
                        TextEdit::singleline(&mut self.search_input)
                            .hint_text("Search Wikimedia Commons images..."),
                    );
                    let submitted =
                        resp.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
                    if ui.button("Search").clicked() || submitted {
                        self.submit_search();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("⚙ Preferences").clicked() {
                            self.open_settings_modal = true;
                        }
                        if ui.button("Logs").clicked() {
                            self.show_logs = !self.show_logs;
                        }
                        ui.separator();
                        status_chip(ui, &*ASSIST_STATUS);
                        status_chip(ui, &*SEARCH_STATUS);
                    });
                });
            });
    }
}
