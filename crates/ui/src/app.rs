use std::sync::mpsc::TrySendError;
use std::time::Duration;

use engine::{
    Command, Event, MAX_ZOOM_PERCENT, MIN_ZOOM_PERCENT, RenderModel, Snapshot, TICK_INTERVAL_MS,
    format_mmss,
};
use iced::widget::{
    button, canvas, checkbox, column, row, scrollable, slider, text, text_input,
};
use iced::{Element, Length, Subscription, Task};

use crate::bridge::{BridgeEvent, EngineCommandSender, engine_subscription};
use crate::widgets::waveform::{self, WaveformEvent};

/// Delay between a mutation and the coalesced redraw it triggers.
const REDRAW_DEBOUNCE_MS: u64 = 20;

/// UI messages handled by the iced app update loop.
#[derive(Debug, Clone)]
pub enum Message {
    OpenFilePressed,
    AnalyzePressed,
    PlayPressed,
    StopPressed,
    MergePressed,
    ExportCsvPressed,
    ExportPngPressed,
    SaveProjectPressed,
    OpenProjectPressed,
    ZoomSliderChanged(u32),
    ZoomEntryChanged(String),
    ZoomEntrySubmitted,
    ScrollChanged(f64),
    SegmentToggled(usize, bool),
    RenameEntryChanged(String),
    RenameSubmitted,
    MergeLabelChanged(String),
    Waveform(WaveformEvent),
    TransportChanged(f64),
    TransportReleased,
    Tick,
    RedrawDue,
    Bridge(BridgeEvent),
}

/// Root UI state.
pub struct AppState {
    engine_tx: Option<EngineCommandSender>,
    snapshot: Snapshot,
    render: Option<RenderModel>,
    waveform_cache: canvas::Cache,
    zoom_percent: u32,
    zoom_entry: String,
    rename_entry: String,
    merge_label: String,
    /// Transport position while the user holds the slider; seeking happens
    /// on release only.
    transport_preview: Option<f64>,
    /// Boundary drags are coalesced: at most one move request is in flight
    /// and the freshest pointer position waits here.
    pending_drag_time: Option<f64>,
    drag_in_flight: bool,
    status: String,
}

impl AppState {
    /// Boots the app and initializes the engine bridge.
    pub fn boot() -> (Self, Task<Message>) {
        (
            Self {
                engine_tx: None,
                snapshot: Snapshot::default(),
                render: None,
                waveform_cache: canvas::Cache::new(),
                zoom_percent: 100,
                zoom_entry: String::from("100"),
                rename_entry: String::new(),
                merge_label: String::new(),
                transport_preview: None,
                pending_drag_time: None,
                drag_in_flight: false,
                status: String::from("starting engine bridge"),
            },
            Task::none(),
        )
    }

    /// Handles one UI message.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFilePressed => {
                let picked = rfd::FileDialog::new()
                    .add_filter("Audio files", &["mp3", "wav", "flac"])
                    .pick_file();
                if let Some(path) = picked {
                    if self.send_command(Command::Load { path: path.clone() }) {
                        self.status = format!("loading {}", path.display());
                    }
                }
            }
            Message::AnalyzePressed => {
                if self.send_command(Command::Analyze) {
                    self.status = String::from("analyzing segments");
                }
            }
            Message::PlayPressed => {
                self.send_command(Command::PlaySelected);
            }
            Message::StopPressed => {
                self.send_command(Command::Stop);
            }
            Message::MergePressed => {
                let label = Some(self.merge_label.trim().to_owned())
                    .filter(|label| !label.is_empty());
                if self.send_command(Command::MergeSelected { label }) {
                    self.merge_label.clear();
                }
            }
            Message::ExportCsvPressed => {
                let picked = rfd::FileDialog::new()
                    .add_filter("CSV files", &["csv"])
                    .save_file();
                if let Some(path) = picked {
                    self.send_command(Command::ExportCsv { path });
                }
            }
            Message::ExportPngPressed => {
                let picked = rfd::FileDialog::new()
                    .add_filter("PNG image", &["png"])
                    .save_file();
                if let Some(path) = picked {
                    self.send_command(Command::ExportPng { path });
                }
            }
            Message::SaveProjectPressed => {
                let picked = rfd::FileDialog::new()
                    .add_filter("Project files", &["json"])
                    .save_file();
                if let Some(path) = picked {
                    self.send_command(Command::SaveProject { path });
                }
            }
            Message::OpenProjectPressed => {
                let picked = rfd::FileDialog::new()
                    .add_filter("Project files", &["json"])
                    .pick_file();
                if let Some(path) = picked {
                    self.send_command(Command::OpenProject { path });
                }
            }
            Message::ZoomSliderChanged(percent) => {
                self.zoom_percent = percent;
                self.zoom_entry = percent.to_string();
                self.send_command(Command::Zoom { percent });
            }
            Message::ZoomEntryChanged(entry) => {
                self.zoom_entry = entry;
            }
            Message::ZoomEntrySubmitted => match self.zoom_entry.trim().parse::<u32>() {
                Ok(value) => {
                    let percent = value.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT);
                    self.zoom_percent = percent;
                    self.zoom_entry = percent.to_string();
                    self.send_command(Command::Zoom { percent });
                }
                Err(_) => {
                    self.status = String::from("invalid zoom value");
                    self.zoom_entry = self.zoom_percent.to_string();
                }
            },
            Message::ScrollChanged(fraction) => {
                self.send_command(Command::Scroll { fraction });
            }
            Message::SegmentToggled(index, selected) => {
                let mut indices = self.snapshot.selection.clone();
                if selected {
                    if !indices.contains(&index) {
                        indices.push(index);
                    }
                } else {
                    indices.retain(|&existing| existing != index);
                }
                self.send_command(Command::Select { indices });
            }
            Message::RenameEntryChanged(entry) => {
                self.rename_entry = entry;
            }
            Message::RenameSubmitted => {
                if let Some(&index) = self.snapshot.selection.first() {
                    let label = self.rename_entry.trim().to_owned();
                    if !label.is_empty() && self.send_command(Command::Rename { index, label }) {
                        self.rename_entry.clear();
                    }
                }
            }
            Message::MergeLabelChanged(entry) => {
                self.merge_label = entry;
            }
            Message::Waveform(WaveformEvent::Pressed(time)) => {
                self.send_command(Command::PointerPressed { time });
            }
            Message::Waveform(WaveformEvent::Dragged(time)) => {
                self.pending_drag_time = Some(time);
                self.flush_drag_request();
            }
            Message::Waveform(WaveformEvent::Released) => {
                self.flush_drag_request();
                self.pending_drag_time = None;
                self.drag_in_flight = false;
                self.send_command(Command::PointerReleased);
            }
            Message::TransportChanged(offset) => {
                self.transport_preview = Some(offset);
            }
            Message::TransportReleased => {
                if let Some(offset) = self.transport_preview.take() {
                    self.send_command(Command::Seek {
                        offset_seconds: offset,
                    });
                }
            }
            Message::Tick => {
                self.send_command(Command::Tick);
            }
            Message::RedrawDue => {
                self.send_command(Command::Redraw);
            }
            Message::Bridge(BridgeEvent::Ready(sender)) => {
                self.engine_tx = Some(sender);
                self.status = String::from("engine ready");
            }
            Message::Bridge(BridgeEvent::Event(event)) => {
                return self.apply_engine_event(event);
            }
            Message::Bridge(BridgeEvent::Disconnected) => {
                self.status = String::from("engine event channel closed");
                self.engine_tx = None;
                self.pending_drag_time = None;
                self.drag_in_flight = false;
            }
        }

        Task::none()
    }

    fn send_command(&mut self, command: Command) -> bool {
        if let Some(sender) = &self.engine_tx {
            match sender.try_send(command) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.status = String::from("engine command queue is full");
                    false
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.status = String::from("engine command channel closed");
                    self.engine_tx = None;
                    self.drag_in_flight = false;
                    false
                }
            }
        } else {
            self.status = String::from("engine is not ready");
            false
        }
    }

    fn flush_drag_request(&mut self) {
        if self.drag_in_flight {
            return;
        }
        let Some(time) = self.pending_drag_time.take() else {
            return;
        };
        if self.send_command(Command::PointerDragged { time }) {
            self.drag_in_flight = true;
        } else {
            self.pending_drag_time = Some(time);
        }
    }

    fn apply_engine_event(&mut self, event: Event) -> Task<Message> {
        match event {
            Event::SessionChanged(snapshot) => {
                let audio_changed = match (&self.snapshot.audio, &snapshot.audio) {
                    (Some(previous), Some(current)) => previous.path != current.path,
                    (None, Some(_)) => true,
                    _ => false,
                };
                self.snapshot = snapshot;
                if audio_changed {
                    self.zoom_percent = 100;
                    self.zoom_entry = String::from("100");
                    self.status = String::from("audio loaded");
                }
                if self.snapshot.playback.is_none() {
                    self.transport_preview = None;
                }
            }
            Event::BoundaryMoved { .. } => {
                self.drag_in_flight = false;
                self.flush_drag_request();
            }
            Event::PlaybackProgress { cursor, elapsed } => {
                if let Some(playback) = self.snapshot.playback.as_mut() {
                    playback.cursor = cursor;
                    playback.elapsed = elapsed;
                }
            }
            Event::RedrawScheduled => {
                return Task::perform(
                    tokio::time::sleep(Duration::from_millis(REDRAW_DEBOUNCE_MS)),
                    |_| Message::RedrawDue,
                );
            }
            Event::RenderReady(model) => {
                self.render = Some(model);
                self.waveform_cache.clear();
            }
            Event::ExportFinished { path } => {
                self.status = format!("export finished: {}", path.display());
            }
            Event::ProjectSaved { path } => {
                self.status = format!("project saved: {}", path.display());
            }
            Event::Error(error) => {
                self.status = format!("error: {}", error.message);
                self.drag_in_flight = false;
            }
        }

        Task::none()
    }

    /// Renders the UI tree.
    pub fn view(&self) -> Element<'_, Message> {
        let has_audio = self.snapshot.audio.is_some();
        let has_segments = !self.snapshot.segments.is_empty();
        let has_selection = !self.snapshot.selection.is_empty();

        let transport_controls = row![
            button("Open audio").on_press(Message::OpenFilePressed),
            enabled_when(button("Analyze"), has_audio, Message::AnalyzePressed),
            enabled_when(button("Play segment"), has_selection, Message::PlayPressed),
            enabled_when(
                button("Stop"),
                self.snapshot.playback.is_some(),
                Message::StopPressed
            ),
        ]
        .spacing(12);

        let label_controls = row![
            text_input("new label", &self.rename_entry)
                .on_input(Message::RenameEntryChanged)
                .on_submit(Message::RenameSubmitted),
            enabled_when(button("Rename"), has_selection, Message::RenameSubmitted),
            text_input("merged label", &self.merge_label).on_input(Message::MergeLabelChanged),
            enabled_when(
                button("Merge selected"),
                self.snapshot.selection.len() >= 2,
                Message::MergePressed
            ),
        ]
        .spacing(12);

        let export_controls = row![
            enabled_when(button("Export CSV"), has_segments, Message::ExportCsvPressed),
            enabled_when(button("Export PNG"), has_audio, Message::ExportPngPressed),
            enabled_when(
                button("Save project"),
                has_audio,
                Message::SaveProjectPressed
            ),
            button("Open project").on_press(Message::OpenProjectPressed),
        ]
        .spacing(12);

        let waveform = waveform::view(self.render.as_ref(), &self.waveform_cache, Message::Waveform);

        let zoom_controls = row![
            text("Zoom (%)"),
            slider(
                MIN_ZOOM_PERCENT..=MAX_ZOOM_PERCENT,
                self.zoom_percent,
                Message::ZoomSliderChanged
            ),
            text_input("100", &self.zoom_entry)
                .width(Length::Fixed(80.0))
                .on_input(Message::ZoomEntryChanged)
                .on_submit(Message::ZoomEntrySubmitted),
        ]
        .spacing(12);

        let scroll_fraction = self
            .snapshot
            .view
            .map(|view| view.scroll_fraction)
            .unwrap_or(0.0);
        let scroll_control = slider(0.0..=1.0, scroll_fraction, Message::ScrollChanged).step(0.005);

        let mut content = column![
            transport_controls,
            label_controls,
            export_controls,
            waveform,
            zoom_controls,
            scroll_control,
        ]
        .spacing(12)
        .padding(16);

        if let Some(playback) = self.snapshot.playback {
            let shown_elapsed = self.transport_preview.unwrap_or(playback.elapsed);
            let transport = row![
                slider(
                    0.0..=playback.segment_duration,
                    shown_elapsed,
                    Message::TransportChanged
                )
                .step(0.05)
                .on_release(Message::TransportReleased),
                text(format!(
                    "{} / {}",
                    format_mmss(shown_elapsed),
                    format_mmss(playback.segment_duration)
                )),
            ]
            .spacing(12);
            content = content.push(transport);
        }

        content = content.push(self.segment_list());
        content = content.push(text(format!("Status: {}", self.status)));

        content.into()
    }

    fn segment_list(&self) -> Element<'_, Message> {
        let mut list = column![].spacing(4);
        for (index, segment) in self.snapshot.segments.iter().enumerate() {
            let caption = format!(
                "{}  {} - {}",
                segment.label,
                format_mmss(segment.start),
                format_mmss(segment.end)
            );
            let selected = self.snapshot.selection.contains(&index);
            list = list.push(
                checkbox(caption, selected)
                    .on_toggle(move |checked| Message::SegmentToggled(index, checked)),
            );
        }
        scrollable(list).height(Length::Fixed(160.0)).into()
    }

    /// Subscribes to bridge events and, while playing, the progress timer.
    pub fn subscription(&self) -> Subscription<Message> {
        let bridge = engine_subscription().map(Message::Bridge);
        if self.snapshot.playback.is_some() {
            let tick = iced::time::every(Duration::from_millis(TICK_INTERVAL_MS))
                .map(|_| Message::Tick);
            Subscription::batch([bridge, tick])
        } else {
            bridge
        }
    }

    #[cfg(test)]
    fn from_sender_for_test(engine_tx: EngineCommandSender) -> Self {
        let (mut state, _task) = Self::boot();
        state.engine_tx = Some(engine_tx);
        state.status = String::from("idle");
        state
    }
}

fn enabled_when<'a>(
    widget: iced::widget::Button<'a, Message>,
    enabled: bool,
    message: Message,
) -> iced::widget::Button<'a, Message> {
    if enabled { widget.on_press(message) } else { widget }
}
