use crossbeam::channel::{Receiver, Sender};

use super::provider::EncodedImage;

/// Which output area a generation writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneKind {
    Story,
    Analysis,
    Chat,
}

/// One output area of the viewer.
#[derive(Debug, Clone, Default)]
pub struct PaneOutput {
    pub text: String,
    pub streaming: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// The image the open viewer session is about.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub url: String,
    pub title: String,
}

/// Per-selection encoding cache. Monotonic: Absent -> Fetching -> Cached;
/// back to Absent only through a new selection (or a failed fetch).
#[derive(Debug, Clone, Default)]
pub enum EncodingState {
    #[default]
    Absent,
    Fetching,
    Cached(EncodedImage),
}

/// A generation the user asked for. Queued while the encoding is in flight.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub pane: PaneKind,
    pub prompt: String,
    pub streaming: bool,
    pub epoch: u64,
}

/// Work the UI glue must run on the runtime for the controller.
#[derive(Debug, Clone)]
pub enum AssistAction {
    FetchEncoding { url: String, epoch: u64 },
    Generate { job: GenerationJob, image: EncodedImage },
}

/// Messages from worker tasks back into the panel, drained each frame.
#[derive(Debug, Clone)]
pub enum AssistUpdate {
    Encoded { epoch: u64, image: EncodedImage },
    EncodingFailed { epoch: u64, error: String },
    Interim { epoch: u64, pane: PaneKind, delta: String },
    Done { epoch: u64, pane: PaneKind, full: String },
    Failed { epoch: u64, pane: PaneKind, error: String },
}

/// AI assistant controller for the viewer.
///
/// Owns the selected image, the lazily-fetched encoding and the three output
/// panes. Like the pager it never performs I/O: `generate` and `apply` hand
/// back `AssistAction`s for the caller to execute, and workers report through
/// the update channel. Every action and update carries the selection epoch;
/// anything stamped with a previous selection is dropped on arrival instead
/// of landing in the current panes.
pub struct AssistPanel {
    selected: Option<SelectedImage>,
    encoding: EncodingState,
    epoch: u64,
    queued: Vec<GenerationJob>,
    pub story: PaneOutput,
    pub analysis: PaneOutput,
    pub chat: PaneOutput,
    pub transcript: Vec<ChatTurn>,
    pub genre: String,
    pub chat_input: String,
    pub update_tx: Sender<AssistUpdate>,
    update_rx: Receiver<AssistUpdate>,
}

impl Default for AssistPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl AssistPanel {
    pub fn new() -> Self {
        let (update_tx, update_rx) = crossbeam::channel::unbounded();
        Self {
            selected: None,
            encoding: EncodingState::Absent,
            epoch: 0,
            queued: Vec::new(),
            story: PaneOutput::default(),
            analysis: PaneOutput::default(),
            chat: PaneOutput::default(),
            transcript: Vec::new(),
            genre: super::prompts::GENRES[0].to_string(),
            chat_input: String::new(),
            update_tx,
            update_rx,
        }
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn encoding(&self) -> &EncodingState {
        &self.encoding
    }

    /// Open a viewer session for an image: resets the encoding cache and all
    /// three output panes.
    pub fn select_image(&mut self, url: &str, title: &str) {
        self.epoch += 1;
        self.selected = Some(SelectedImage {
            url: url.to_string(),
            title: title.to_string(),
        });
        self.encoding = EncodingState::Absent;
        self.queued.clear();
        self.story = PaneOutput::default();
        self.analysis = PaneOutput::default();
        self.chat = PaneOutput::default();
        self.transcript.clear();
    }

    /// Close the viewer session.
    pub fn clear_selection(&mut self) {
        self.epoch += 1;
        self.selected = None;
        self.encoding = EncodingState::Absent;
        self.queued.clear();
    }

    /// Ask for a generation into `pane`. No-op without a selection. The
    /// encoding fetch happens at most once per selection; jobs arriving while
    /// it is in flight are queued and dispatched when it lands.
    pub fn generate(&mut self, pane: PaneKind, prompt: String, streaming: bool) -> Option<AssistAction> {
        let selected = self.selected.as_ref()?;
        let url = selected.url.clone();
        let job = GenerationJob {
            pane,
            prompt,
            streaming,
            epoch: self.epoch,
        };
        let out = self.pane_mut(pane);
        out.error = None;
        out.streaming = true;
        if pane != PaneKind::Chat {
            out.text.clear();
        }
        match &self.encoding {
            EncodingState::Cached(image) => Some(AssistAction::Generate {
                job,
                image: image.clone(),
            }),
            EncodingState::Fetching => {
                self.queued.push(job);
                None
            }
            EncodingState::Absent => {
                self.encoding = EncodingState::Fetching;
                self.queued.push(job);
                Some(AssistAction::FetchEncoding {
                    url,
                    epoch: self.epoch,
                })
            }
        }
    }

    /// Drain the update channel. Returns follow-up actions (generations that
    /// were waiting for the encoding) plus the number of updates processed.
    pub fn poll(&mut self) -> (Vec<AssistAction>, usize) {
        let updates: Vec<AssistUpdate> = self.update_rx.try_iter().collect();
        let processed = updates.len();
        let mut actions = Vec::new();
        for update in updates {
            actions.extend(self.apply(update));
        }
        (actions, processed)
    }

    /// Fold one worker update into the panel state.
    pub fn apply(&mut self, update: AssistUpdate) -> Vec<AssistAction> {
        let epoch = match &update {
            AssistUpdate::Encoded { epoch, .. }
            | AssistUpdate::EncodingFailed { epoch, .. }
            | AssistUpdate::Interim { epoch, .. }
            | AssistUpdate::Done { epoch, .. }
            | AssistUpdate::Failed { epoch, .. } => *epoch,
        };
        if epoch != self.epoch {
            log::debug!("dropping stale assist update (epoch {epoch} != {})", self.epoch);
            return Vec::new();
        }
        match update {
            AssistUpdate::Encoded { image, .. } => {
                self.encoding = EncodingState::Cached(image.clone());
                self.queued
                    .drain(..)
                    .map(|job| AssistAction::Generate {
                        job,
                        image: image.clone(),
                    })
                    .collect()
            }
            AssistUpdate::EncodingFailed { error, .. } => {
                self.encoding = EncodingState::Absent;
                for job in std::mem::take(&mut self.queued) {
                    let out = self.pane_mut(job.pane);
                    out.streaming = false;
                    out.error = Some(format!("image fetch failed: {error}"));
                }
                Vec::new()
            }
            AssistUpdate::Interim { pane, delta, .. } => {
                // Arrival order, plain concatenation.
                self.pane_mut(pane).text.push_str(&delta);
                Vec::new()
            }
            AssistUpdate::Done { pane, full, .. } => {
                match pane {
                    PaneKind::Chat => {
                        self.transcript.push(ChatTurn {
                            role: ChatRole::Assistant,
                            text: full,
                        });
                        self.chat.text.clear();
                        self.chat.streaming = false;
                    }
                    _ => {
                        let out = self.pane_mut(pane);
                        out.text = full;
                        out.streaming = false;
                    }
                }
                Vec::new()
            }
            AssistUpdate::Failed { pane, error, .. } => {
                let out = self.pane_mut(pane);
                out.streaming = false;
                out.error = Some(error);
                Vec::new()
            }
        }
    }

    pub fn pane(&self, pane: PaneKind) -> &PaneOutput {
        match pane {
            PaneKind::Story => &self.story,
            PaneKind::Analysis => &self.analysis,
            PaneKind::Chat => &self.chat,
        }
    }

    fn pane_mut(&mut self, pane: PaneKind) -> &mut PaneOutput {
        match pane {
            PaneKind::Story => &mut self.story,
            PaneKind::Analysis => &mut self.analysis,
            PaneKind::Chat => &mut self.chat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded() -> EncodedImage {
        EncodedImage {
            mime: "image/jpeg".into(),
            data_b64: "aGVsbG8=".into(),
        }
    }

    fn select(panel: &mut AssistPanel) -> u64 {
        panel.select_image("https://upload.example/sunset.jpg", "Sunset.jpg");
        match panel.generate(PaneKind::Story, "p".into(), true) {
            Some(AssistAction::FetchEncoding { epoch, .. }) => epoch,
            other => panic!("expected FetchEncoding, got {other:?}"),
        }
    }

    #[test]
    fn generate_without_selection_is_noop() {
        let mut panel = AssistPanel::new();
        assert!(panel.generate(PaneKind::Story, "p".into(), true).is_none());
        assert!(panel.story.text.is_empty());
        assert!(!panel.story.streaming);
    }

    #[test]
    fn encoding_fetched_at_most_once_per_selection() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);

        // Second request while the fetch is in flight: queued, no second fetch.
        assert!(panel.generate(PaneKind::Analysis, "a".into(), false).is_none());

        let actions = panel.apply(AssistUpdate::Encoded {
            epoch,
            image: encoded(),
        });
        // Both queued jobs dispatch against the cached encoding.
        assert_eq!(actions.len(), 2);
        assert!(matches!(panel.encoding(), EncodingState::Cached(_)));

        // Third request is a cache hit, never another fetch.
        match panel.generate(PaneKind::Chat, "c".into(), true) {
            Some(AssistAction::Generate { .. }) => {}
            other => panic!("expected Generate, got {other:?}"),
        }
    }

    #[test]
    fn chunks_append_in_arrival_order() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);
        panel.apply(AssistUpdate::Encoded { epoch, image: encoded() });
        for delta in ["Once", "upon", "a time"] {
            panel.apply(AssistUpdate::Interim {
                epoch,
                pane: PaneKind::Story,
                delta: delta.into(),
            });
        }
        assert_eq!(panel.story.text, "Onceupona time");
    }

    #[test]
    fn done_finalizes_pane_and_chat_transcript() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);
        panel.apply(AssistUpdate::Encoded { epoch, image: encoded() });
        panel.apply(AssistUpdate::Done {
            epoch,
            pane: PaneKind::Story,
            full: "The story.".into(),
        });
        assert_eq!(panel.story.text, "The story.");
        assert!(!panel.story.streaming);

        panel.transcript.push(ChatTurn { role: ChatRole::User, text: "hi".into() });
        let _ = panel.generate(PaneKind::Chat, "c".into(), true);
        panel.apply(AssistUpdate::Done {
            epoch,
            pane: PaneKind::Chat,
            full: "hello there".into(),
        });
        assert_eq!(panel.transcript.len(), 2);
        assert_eq!(panel.transcript[1].text, "hello there");
        assert!(panel.chat.text.is_empty());
    }

    #[test]
    fn failure_writes_inline_error_only_to_its_pane() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);
        panel.apply(AssistUpdate::Encoded { epoch, image: encoded() });
        panel.apply(AssistUpdate::Failed {
            epoch,
            pane: PaneKind::Story,
            error: "quota exceeded".into(),
        });
        assert_eq!(panel.story.error.as_deref(), Some("quota exceeded"));
        assert!(!panel.story.streaming);
        assert!(panel.analysis.error.is_none());
        assert!(panel.chat.error.is_none());
    }

    #[test]
    fn stale_updates_from_previous_selection_are_dropped() {
        let mut panel = AssistPanel::new();
        let old_epoch = select(&mut panel);
        // New selection while the old encoding fetch is in flight.
        panel.select_image("https://upload.example/other.jpg", "Other.jpg");

        let actions = panel.apply(AssistUpdate::Encoded {
            epoch: old_epoch,
            image: encoded(),
        });
        assert!(actions.is_empty());
        assert!(matches!(panel.encoding(), EncodingState::Absent));

        panel.apply(AssistUpdate::Interim {
            epoch: old_epoch,
            pane: PaneKind::Story,
            delta: "stale".into(),
        });
        assert!(panel.story.text.is_empty());
    }

    #[test]
    fn clear_selection_discards_cache_and_blocks_generation() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);
        panel.apply(AssistUpdate::Encoded { epoch, image: encoded() });
        panel.clear_selection();
        assert!(matches!(panel.encoding(), EncodingState::Absent));
        assert!(panel.generate(PaneKind::Story, "p".into(), true).is_none());
    }

    #[test]
    fn select_image_resets_panes() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);
        panel.apply(AssistUpdate::Encoded { epoch, image: encoded() });
        panel.apply(AssistUpdate::Interim {
            epoch,
            pane: PaneKind::Story,
            delta: "text".into(),
        });
        panel.transcript.push(ChatTurn { role: ChatRole::User, text: "hi".into() });

        panel.select_image("https://upload.example/next.jpg", "Next.jpg");
        assert!(panel.story.text.is_empty());
        assert!(panel.transcript.is_empty());
        assert!(matches!(panel.encoding(), EncodingState::Absent));
    }

    #[test]
    fn encoding_failure_fails_queued_jobs_inline() {
        let mut panel = AssistPanel::new();
        let epoch = select(&mut panel);
        panel.apply(AssistUpdate::EncodingFailed {
            epoch,
            error: "404".into(),
        });
        assert!(panel.story.error.as_deref().unwrap().contains("404"));
        assert!(matches!(panel.encoding(), EncodingState::Absent));
    }
}
