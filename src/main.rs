pub mod ai;
pub mod app;
pub mod receive;
pub mod search;
pub mod settings;
pub mod ui;

pub use search::{ImageHit, PageRequest, SearchOutcome};
pub use settings::UiSettings;

impl eframe::App for app::ImageScoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.receive(ctx);
        self.navbar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.gallery(ui);
        });
        self.viewer(ctx);
    }
}

#[tokio::main]
async fn main() -> eframe::Result<()> {
    egui_logger::builder()
        .max_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    eframe::run_native(
        format!("Image Scout {}", env!("CARGO_PKG_VERSION")).as_str(),
        eframe::NativeOptions {
            viewport: eframe::egui::ViewportBuilder::default()
                .with_inner_size([1100.0, 780.0]),
            ..Default::default()
        },
        Box::new(|cc| Ok(Box::new(app::ImageScoutApp::new(cc)))),
    )
}
