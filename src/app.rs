use crossbeam::channel::{Receiver, Sender};
use egui_toast::{ToastKind, Toasts};

use crate::ai::assist::{AssistAction, AssistPanel, AssistUpdate, PaneKind};
use crate::ai::provider;
use crate::search::{commons, PageRequest, SearchOutcome};
use crate::search::pager::SearchPager;
use crate::ui::status::{GlobalStatusIndicator, StatusState, ASSIST_STATUS, SEARCH_STATUS};
use crate::{ImageHit, UiSettings};

pub struct ImageScoutApp {
    pub first_run: bool,
    pub settings: UiSettings,
    // Draft copy of settings while editing in the modal
    pub settings_draft: Option<UiSettings>,
    pub open_settings_modal: bool,
    pub show_logs: bool,

    // Search side
    pub search_input: String,
    pub pager: SearchPager,
    pub search_tx: Sender<SearchOutcome>,
    pub search_rx: Receiver<SearchOutcome>,

    // Viewer + assistant
    pub assist: AssistPanel,
    pub viewer_hit: Option<ImageHit>,
    pub active_pane: PaneKind,

    // Toasts manager and channel for async notifications
    pub toasts: Toasts,
    pub toast_tx: Sender<(ToastKind, String)>,
    pub toast_rx: Receiver<(ToastKind, String)>,
}

impl ImageScoutApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (search_tx, search_rx) = crossbeam::channel::unbounded();
        let (toast_tx, toast_rx) = crossbeam::channel::unbounded();
        let settings = UiSettings::from_env();
        let mut pager = SearchPager::new();
        pager.set_page_size(settings.page_size);

        Self {
            first_run: true,
            settings,
            settings_draft: None,
            open_settings_modal: false,
            show_logs: false,
            search_input: String::new(),
            pager,
            search_tx,
            search_rx,
            assist: AssistPanel::new(),
            viewer_hit: None,
            active_pane: PaneKind::Story,
            toasts: Toasts::new().anchor(eframe::egui::Align2::RIGHT_TOP, (-10.0, 10.0)),
            toast_tx,
            toast_rx,
        }
    }

    pub fn toast(&self, kind: ToastKind, text: impl Into<String>) {
        let _ = self.toast_tx.try_send((kind, text.into()));
    }

    /// Submit the search bar. The pager decides whether anything happens.
    pub fn submit_search(&mut self) {
        self.pager.set_page_size(self.settings.page_size);
        let query = self.search_input.clone();
        let req = self.pager.search(&query);
        self.spawn_fetch(req);
    }

    /// Execute a page request on the runtime, if the pager issued one.
    pub fn spawn_fetch(&mut self, req: Option<PageRequest>) {
        let Some(req) = req else { return };
        SEARCH_STATUS.set_state(
            StatusState::Running,
            format!("\"{}\" @ {}", req.query, req.offset),
        );
        let tx = self.search_tx.clone();
        tokio::spawn(async move {
            let outcome = match fetch_outcome(&req).await {
                Ok((hits, next_offset)) => SearchOutcome::Page {
                    epoch: req.epoch,
                    hits,
                    next_offset,
                },
                Err(e) => {
                    log::error!("page fetch for \"{}\" failed: {e:#}", req.query);
                    SearchOutcome::Failed {
                        epoch: req.epoch,
                        error: e.to_string(),
                    }
                }
            };
            let _ = tx.try_send(outcome);
        });
    }

    /// Open the viewer on a card and hand the selection to the assistant.
    pub fn open_viewer(&mut self, hit: &ImageHit) {
        self.assist.select_image(&hit.thumb_url, &hit.title);
        self.viewer_hit = Some(hit.clone());
        self.active_pane = PaneKind::Story;
    }

    pub fn close_viewer(&mut self) {
        self.assist.clear_selection();
        self.viewer_hit = None;
    }

    /// Ask the assistant for a generation and run whatever it hands back.
    pub fn run_assist(&mut self, pane: PaneKind, prompt: String, streaming: bool) {
        if let Some(action) = self.assist.generate(pane, prompt, streaming) {
            self.dispatch_assist(action);
        }
    }

    pub fn dispatch_assist(&mut self, action: AssistAction) {
        let tx = self.assist.update_tx.clone();
        match action {
            AssistAction::FetchEncoding { url, epoch } => {
                ASSIST_STATUS.set_state(StatusState::Running, "Encoding image");
                tokio::spawn(async move {
                    let update = match fetch_and_encode(&url).await {
                        Ok(image) => AssistUpdate::Encoded { epoch, image },
                        Err(e) => {
                            log::error!("image encoding fetch failed: {e:#}");
                            AssistUpdate::EncodingFailed {
                                epoch,
                                error: e.to_string(),
                            }
                        }
                    };
                    let _ = tx.try_send(update);
                });
            }
            AssistAction::Generate { job, image } => {
                let cfg = self.settings.provider_config();
                ASSIST_STATUS.set_state(StatusState::Running, format!("{} request", cfg.provider));
                tokio::spawn(async move {
                    let epoch = job.epoch;
                    let pane = job.pane;
                    let result = if job.streaming {
                        let tx_interim = tx.clone();
                        provider::stream_generation(cfg, &job.prompt, Some(&image), |tok| {
                            let _ = tx_interim.try_send(AssistUpdate::Interim {
                                epoch,
                                pane,
                                delta: tok.to_string(),
                            });
                        })
                        .await
                    } else {
                        provider::generate_once(cfg, &job.prompt, Some(&image)).await
                    };
                    let update = match result {
                        Ok(full) => AssistUpdate::Done { epoch, pane, full },
                        Err(e) => {
                            log::error!("generation failed: {e:#}");
                            AssistUpdate::Failed {
                                epoch,
                                pane,
                                error: e.to_string(),
                            }
                        }
                    };
                    let _ = tx.try_send(update);
                });
            }
        }
    }
}

async fn fetch_outcome(req: &PageRequest) -> anyhow::Result<(Vec<ImageHit>, Option<u64>)> {
    let client = reqwest::Client::builder().build()?;
    commons::fetch_page(&client, &req.query, req.offset, req.limit).await
}

async fn fetch_and_encode(url: &str) -> anyhow::Result<provider::EncodedImage> {
    let client = reqwest::Client::builder().build()?;
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("image fetch error {}", status);
    }
    let bytes = resp.bytes().await?;
    Ok(provider::encode_image_bytes(&bytes))
}
