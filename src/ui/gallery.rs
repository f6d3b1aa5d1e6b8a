use eframe::egui::*;

use crate::search::pager::SCROLL_FETCH_MARGIN;
use crate::ImageHit;

const CARD_WIDTH: f32 = 210.0;
const CARD_HEIGHT: f32 = 190.0;

impl crate::app::ImageScoutApp {
    /// Card grid with infinite scroll: when the viewport gets close to the
    /// end of the content, the pager is asked for the next page.
    pub fn gallery(&mut self, ui: &mut Ui) {
        if self.pager.query().is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label("Search Wikimedia Commons to fill the gallery.");
            });
            return;
        }
        if self.pager.no_results {
            ui.centered_and_justified(|ui| {
                ui.label(format!("No results for \"{}\".", self.pager.query()));
            });
            return;
        }

        let mut clicked: Option<ImageHit> = None;
        let output = ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let cols = ((ui.available_width() / (CARD_WIDTH + 8.0)) as usize).max(1);
                for row in self.pager.hits.chunks(cols) {
                    ui.horizontal(|ui| {
                        for hit in row {
                            if card(ui, hit).clicked() {
                                clicked = Some(hit.clone());
                            }
                        }
                    });
                }

                ui.vertical_centered(|ui| {
                    if self.pager.is_loading() {
                        ui.add_space(8.0);
                        ui.spinner();
                    } else if !self.pager.has_more() && !self.pager.hits.is_empty() {
                        ui.add_space(8.0);
                        ui.weak("No more results.");
                    }
                });
            });

        if let Some(hit) = clicked {
            self.open_viewer(&hit);
        }

        let near_end = output.state.offset.y + output.inner_rect.height() + SCROLL_FETCH_MARGIN
            >= output.content_size.y;
        if near_end && self.pager.can_load_more() {
            let req = self.pager.load_next_page();
            self.spawn_fetch(req);
        }
    }
}

fn card(ui: &mut Ui, hit: &ImageHit) -> Response {
    let (rect, resp) = ui.allocate_exact_size(vec2(CARD_WIDTH, CARD_HEIGHT), Sense::click());
    let mut child = ui.new_child(UiBuilder::new().max_rect(rect.shrink(4.0)));
    child.vertical(|ui| {
        ui.add(
            Image::new(hit.thumb_url.as_str())
                .show_loading_spinner(true)
                .fit_to_exact_size(vec2(CARD_WIDTH - 8.0, CARD_HEIGHT - 34.0)),
        );
        ui.label(RichText::new(&hit.title).small())
            .on_hover_text(&hit.title);
    });
    if resp.hovered() {
        ui.painter().rect_stroke(
            rect,
            6.0,
            ui.style().visuals.widgets.hovered.bg_stroke,
            StrokeKind::Outside,
        );
        ui.output_mut(|o| o.cursor_icon = CursorIcon::PointingHand);
    }
    resp
}
