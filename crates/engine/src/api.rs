use std::path::PathBuf;

use tracing::{debug, info};

use crate::audio::{
    AudioDecoder, BeatDetector, OnsetBeatDetector, PlaybackEngine, RodioPlayback, SymphoniaDecoder,
};
use crate::error::{EngineError, Result};
use crate::export;
use crate::playback::{PlaybackSession, Tick};
use crate::project::{self, Project, Settings};
use crate::render::{PngSurface, RenderModel, RenderSurface, build_render_model};
use crate::segments::Edge;
use crate::timeline::Timeline;

/// Distance in timeline seconds within which a press grabs a segment edge.
pub const EDGE_HIT_EPSILON: f64 = 0.05;

/// Commands accepted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Decodes an audio file and replaces the current project.
    Load { path: PathBuf },
    /// Runs beat detection and regroups the result into segments.
    Analyze,
    /// Press on the waveform at a timeline position; starts a boundary drag
    /// when a segment edge lies within [`EDGE_HIT_EPSILON`].
    PointerPressed { time: f64 },
    /// Drag motion while a boundary is grabbed.
    PointerDragged { time: f64 },
    /// Release of the drag gesture.
    PointerReleased,
    /// Zoom to a percentage of the full view; slider and numeric entry both
    /// normalize to this command and the value is clamped to `1..=10_000`.
    Zoom { percent: u32 },
    /// Scroll the view window to a fraction of the total duration.
    Scroll { fraction: f64 },
    /// Replaces the segment list selection.
    Select { indices: Vec<usize> },
    Rename { index: usize, label: String },
    /// Merges the currently selected segments into one.
    MergeSelected { label: Option<String> },
    /// Starts a preview of the first selected segment.
    PlaySelected,
    Stop,
    /// Restarts the running preview at an offset within the segment.
    Seek { offset_seconds: f64 },
    /// Periodic playback progress poll (50 ms cadence while playing).
    Tick,
    /// Flushes a pending debounced redraw.
    Redraw,
    ExportCsv { path: PathBuf },
    ExportPng { path: PathBuf },
    SaveProject { path: PathBuf },
    OpenProject { path: PathBuf },
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Control-relevant state changed; carries a fresh snapshot.
    SessionChanged(Snapshot),
    /// A boundary drag moved an edge to the (possibly clamped) time.
    BoundaryMoved { index: usize, edge: Edge, time: f64 },
    /// Playback advanced to a new cursor position.
    PlaybackProgress { cursor: f64, elapsed: f64 },
    /// A redraw became pending; emitted once per dirty window.
    RedrawScheduled,
    /// Response to [`Command::Redraw`] with draw data for the current view.
    RenderReady(RenderModel),
    ExportFinished { path: PathBuf },
    ProjectSaved { path: PathBuf },
    /// User-facing failure, produced at the bridge boundary.
    Error(EngineErrorEvent),
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineErrorEvent {
    pub message: String,
}

impl EngineErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            message: error.to_string(),
        }
    }
}

/// Immutable control-state snapshot consumed by the UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub audio: Option<AudioSummary>,
    pub segments: Vec<SegmentSummary>,
    pub selection: Vec<usize>,
    pub view: Option<ViewSummary>,
    pub playback: Option<PlaybackSummary>,
}

/// Snapshot representation of the loaded audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSummary {
    pub path: PathBuf,
    pub duration: f64,
    pub sample_rate: u32,
}

/// Snapshot representation of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

/// Snapshot representation of the visible window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSummary {
    pub view_start: f64,
    pub view_end: f64,
    pub scroll_fraction: f64,
}

/// Snapshot representation of the running preview, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSummary {
    pub segment_index: usize,
    pub elapsed: f64,
    pub segment_duration: f64,
    pub cursor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragTarget {
    index: usize,
    edge: Edge,
}

/// Engine implementation orchestrating the segment store, viewport and
/// playback session against the collaborator backends.
#[derive(Debug)]
pub struct Engine<D, B, P, S> {
    decoder: D,
    beats: B,
    playback: P,
    surface: S,
    settings: Settings,
    project: Option<Project>,
    selection: Vec<usize>,
    session: Option<PlaybackSession>,
    drag: Option<DragTarget>,
    redraw_pending: bool,
}

impl<D, B, P, S> Engine<D, B, P, S>
where
    D: AudioDecoder,
    B: BeatDetector,
    P: PlaybackEngine,
    S: RenderSurface,
{
    /// Creates an engine over the provided collaborator backends.
    pub fn new(decoder: D, beats: B, playback: P, surface: S) -> Self {
        Self {
            decoder,
            beats,
            playback,
            surface,
            settings: Settings::default(),
            project: None,
            selection: Vec::new(),
            session: None,
            drag: None,
            redraw_pending: false,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::Load { path } => self.load(path),
            Command::Analyze => self.analyze(),
            Command::PointerPressed { time } => self.pointer_pressed(time),
            Command::PointerDragged { time } => self.pointer_dragged(time),
            Command::PointerReleased => self.pointer_released(),
            Command::Zoom { percent } => self.zoom(percent),
            Command::Scroll { fraction } => self.scroll(fraction),
            Command::Select { indices } => self.select(indices),
            Command::Rename { index, label } => self.rename(index, label),
            Command::MergeSelected { label } => self.merge_selected(label),
            Command::PlaySelected => self.play_selected(),
            Command::Stop => self.stop(),
            Command::Seek { offset_seconds } => self.seek(offset_seconds),
            Command::Tick => self.tick(),
            Command::Redraw => self.redraw(),
            Command::ExportCsv { path } => self.export_csv(path),
            Command::ExportPng { path } => self.export_png(path),
            Command::SaveProject { path } => self.save_project(path),
            Command::OpenProject { path } => self.open_project(path),
        }
    }

    fn load(&mut self, path: PathBuf) -> Result<Vec<Event>> {
        let decoded = self.decoder.load(&path)?;
        let timeline =
            Timeline::from_samples(decoded.samples, decoded.sample_rate, self.settings.decimation)?;

        self.halt_playback();
        self.selection.clear();
        self.drag = None;
        info!(
            path = ?path,
            duration = timeline.duration(),
            sample_rate = timeline.sample_rate(),
            "audio loaded"
        );
        self.project = Some(Project::new(path, timeline));

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn analyze(&mut self) -> Result<Vec<Event>> {
        let boundaries = {
            let project = self.project.as_ref().ok_or(EngineError::AudioNotLoaded)?;
            let samples = project
                .timeline
                .clip_samples(0.0, project.timeline.duration());
            self.beats.detect(samples, project.timeline.sample_rate())
        };

        {
            let project = self.project.as_mut().ok_or(EngineError::AudioNotLoaded)?;
            project
                .segments
                .analyze(&boundaries, self.settings.min_segment_len)?;
        }
        // Only reached on success: a failed analysis leaves everything,
        // including a running preview, untouched.
        self.halt_playback();
        self.selection.clear();

        let project = self.project.as_ref().ok_or(EngineError::AudioNotLoaded)?;
        info!(
            boundary_count = boundaries.len(),
            segment_count = project.segments.len(),
            "analysis applied"
        );
        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn pointer_pressed(&mut self, time: f64) -> Result<Vec<Event>> {
        let Some(project) = self.project.as_ref() else {
            return Ok(Vec::new());
        };

        self.drag = None;
        // First matching edge in store order wins; each segment offers its
        // start before its end.
        for (index, segment) in project.segments.iter().enumerate() {
            if (time - segment.start).abs() < EDGE_HIT_EPSILON {
                self.drag = Some(DragTarget {
                    index,
                    edge: Edge::Start,
                });
                break;
            }
            if (time - segment.end).abs() < EDGE_HIT_EPSILON {
                self.drag = Some(DragTarget {
                    index,
                    edge: Edge::End,
                });
                break;
            }
        }
        debug!(time, target = ?self.drag, "pointer pressed");
        Ok(Vec::new())
    }

    fn pointer_dragged(&mut self, time: f64) -> Result<Vec<Event>> {
        let Some(target) = self.drag else {
            return Ok(Vec::new());
        };
        let Some(project) = self.project.as_mut() else {
            return Ok(Vec::new());
        };

        let duration = project.timeline.duration();
        let actual = project
            .segments
            .move_boundary(target.index, target.edge, time, duration)?;

        let mut events = vec![Event::BoundaryMoved {
            index: target.index,
            edge: target.edge,
            time: actual,
        }];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn pointer_released(&mut self) -> Result<Vec<Event>> {
        if self.drag.take().is_none() {
            return Ok(Vec::new());
        }
        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn zoom(&mut self, percent: u32) -> Result<Vec<Event>> {
        let Some(project) = self.project.as_mut() else {
            return Ok(Vec::new());
        };
        project.viewport.zoom(percent);

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn scroll(&mut self, fraction: f64) -> Result<Vec<Event>> {
        let Some(project) = self.project.as_mut() else {
            return Ok(Vec::new());
        };
        project.viewport.scroll_to(fraction);

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn select(&mut self, indices: Vec<usize>) -> Result<Vec<Event>> {
        let len = self
            .project
            .as_ref()
            .map(|project| project.segments.len())
            .unwrap_or(0);
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(EngineError::InvalidIndex { index, len });
        }

        let mut selection = indices;
        selection.sort_unstable();
        selection.dedup();
        self.selection = selection;
        Ok(vec![self.session_changed()])
    }

    fn rename(&mut self, index: usize, label: String) -> Result<Vec<Event>> {
        let project = self.project.as_mut().ok_or(EngineError::AudioNotLoaded)?;
        if label.trim().is_empty() {
            // Cancelled or empty entry: nothing changes, nothing redraws.
            return Ok(Vec::new());
        }
        project.segments.rename(index, &label)?;

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn merge_selected(&mut self, label: Option<String>) -> Result<Vec<Event>> {
        let merged = {
            let indices = self.selection.clone();
            let project = self.project.as_mut().ok_or(EngineError::AudioNotLoaded)?;
            project.segments.merge(&indices, label)?
        };
        self.halt_playback();
        self.selection.clear();
        info!(start = merged.start, end = merged.end, label = %merged.label, "segments merged");

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn play_selected(&mut self) -> Result<Vec<Event>> {
        let &index = self
            .selection
            .first()
            .ok_or(EngineError::NoSegmentSelected)?;
        self.halt_playback();

        let project = self.project.as_ref().ok_or(EngineError::AudioNotLoaded)?;
        let segment = project
            .segments
            .get(index)
            .ok_or(EngineError::InvalidIndex {
                index,
                len: project.segments.len(),
            })?
            .clone();

        let clip = project.timeline.clip_samples(segment.start, segment.end);
        let sample_rate = project.timeline.sample_rate();
        let mut started = self.playback.load_clip(clip, sample_rate);
        if started.is_ok() {
            started = self.playback.play(0.0);
        }
        if let Err(error) = started {
            self.playback.stop();
            return Err(error);
        }

        info!(segment_index = index, start = segment.start, end = segment.end, "preview started");
        self.session = Some(PlaybackSession::new(index, &segment));

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn stop(&mut self) -> Result<Vec<Event>> {
        if !self.halt_playback() {
            return Ok(Vec::new());
        }
        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn seek(&mut self, offset_seconds: f64) -> Result<Vec<Event>> {
        let Some(mut session) = self.session.take() else {
            return Ok(Vec::new());
        };
        let offset = offset_seconds.clamp(0.0, session.segment_duration());

        match self.playback.play(offset) {
            Ok(()) => session.seeked(offset),
            Err(EngineError::SeekUnsupported) => match self.playback.play(0.0) {
                Ok(()) => session.seeked_with_restart(offset),
                Err(error) => {
                    self.playback.stop();
                    return Err(error);
                }
            },
            Err(error) => {
                self.playback.stop();
                return Err(error);
            }
        }

        let mut events = vec![Event::PlaybackProgress {
            cursor: session.cursor(),
            elapsed: session.elapsed(),
        }];
        self.session = Some(session);
        self.request_redraw(&mut events);
        Ok(events)
    }

    fn tick(&mut self) -> Result<Vec<Event>> {
        let Some(mut session) = self.session.take() else {
            return Ok(Vec::new());
        };

        match session.apply_tick(self.playback.position_millis()) {
            Tick::Finished => {
                self.playback.stop();
                let mut events = vec![self.session_changed()];
                self.request_redraw(&mut events);
                Ok(events)
            }
            Tick::Progress { cursor, elapsed } => {
                self.session = Some(session);
                let mut events = vec![Event::PlaybackProgress { cursor, elapsed }];
                self.request_redraw(&mut events);
                Ok(events)
            }
        }
    }

    fn redraw(&mut self) -> Result<Vec<Event>> {
        self.redraw_pending = false;
        let Some(project) = self.project.as_ref() else {
            return Ok(Vec::new());
        };
        let cursor = self.session.as_ref().map(PlaybackSession::cursor);
        let model =
            build_render_model(&project.timeline, &project.segments, &project.viewport, cursor);
        Ok(vec![Event::RenderReady(model)])
    }

    fn export_csv(&mut self, path: PathBuf) -> Result<Vec<Event>> {
        let project = self.project.as_ref().ok_or(EngineError::AudioNotLoaded)?;
        export::write_csv(&project.segments, &path)?;
        Ok(vec![Event::ExportFinished { path }])
    }

    fn export_png(&mut self, path: PathBuf) -> Result<Vec<Event>> {
        let project = self.project.as_ref().ok_or(EngineError::AudioNotLoaded)?;
        export::export_waveform(&project.timeline, &project.segments, &mut self.surface, &path)?;
        Ok(vec![Event::ExportFinished { path }])
    }

    fn save_project(&mut self, path: PathBuf) -> Result<Vec<Event>> {
        let project = self.project.as_ref().ok_or(EngineError::AudioNotLoaded)?;
        project::save_project(project, self.settings, &path)?;
        Ok(vec![Event::ProjectSaved { path }])
    }

    fn open_project(&mut self, path: PathBuf) -> Result<Vec<Event>> {
        let saved = project::read_saved_project(&path)?;
        let decoded = self.decoder.load(&saved.source)?;
        let timeline = Timeline::from_samples(
            decoded.samples,
            decoded.sample_rate,
            saved.settings.decimation,
        )?;
        let segments = project::restore_segments(&saved, &timeline)?;

        self.halt_playback();
        self.selection.clear();
        self.drag = None;
        self.settings = saved.settings;
        let mut project = Project::new(saved.source, timeline);
        project.segments = segments;
        info!(path = ?path, segment_count = project.segments.len(), "project opened");
        self.project = Some(project);

        let mut events = vec![self.session_changed()];
        self.request_redraw(&mut events);
        Ok(events)
    }

    /// Stops the backend and drops the session; true when one was running.
    fn halt_playback(&mut self) -> bool {
        if self.session.take().is_some() {
            self.playback.stop();
            true
        } else {
            false
        }
    }

    fn request_redraw(&mut self, events: &mut Vec<Event>) {
        if !self.redraw_pending {
            self.redraw_pending = true;
            events.push(Event::RedrawScheduled);
        }
    }

    fn session_changed(&self) -> Event {
        Event::SessionChanged(self.snapshot())
    }

    fn snapshot(&self) -> Snapshot {
        let audio = self.project.as_ref().map(|project| AudioSummary {
            path: project.source.clone(),
            duration: project.timeline.duration(),
            sample_rate: project.timeline.sample_rate(),
        });
        let segments = self
            .project
            .as_ref()
            .map(|project| {
                project
                    .segments
                    .iter()
                    .map(|segment| SegmentSummary {
                        start: segment.start,
                        end: segment.end,
                        label: segment.label.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let view = self.project.as_ref().map(|project| ViewSummary {
            view_start: project.viewport.start(),
            view_end: project.viewport.end(),
            scroll_fraction: project.viewport.span_fractions().0,
        });
        let playback = self.session.as_ref().map(|session| PlaybackSummary {
            segment_index: session.segment_index(),
            elapsed: session.elapsed(),
            segment_duration: session.segment_duration(),
            cursor: session.cursor(),
        });

        Snapshot {
            audio,
            segments,
            selection: self.selection.clone(),
            view,
            playback,
        }
    }
}

impl Engine<SymphoniaDecoder, OnsetBeatDetector, RodioPlayback, PngSurface> {
    /// Creates an engine wired to the production backends.
    pub fn with_native_backends() -> Self {
        Self::new(
            SymphoniaDecoder,
            OnsetBeatDetector,
            RodioPlayback::new(),
            PngSurface::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use super::{Command, Engine, Event, Snapshot};
    use crate::audio::{AudioDecoder, BeatDetector, DecodedAudio, PlaybackEngine};
    use crate::error::{EngineError, Result};
    use crate::playback::FINISHED_SENTINEL;
    use crate::render::{RenderModel, RenderSurface};
    use crate::segments::Edge;

    const SAMPLE_RATE: u32 = 100;

    type TestEngine = Engine<MockDecoder, MockBeats, MockPlayback, MockSurface>;

    fn test_engine() -> (TestEngine, PlaybackProbe) {
        let playback = MockPlayback::new(true);
        let probe = playback.probe();
        let engine = Engine::new(
            MockDecoder::thirty_seconds(),
            MockBeats::new(vec![0.0, 9.0, 18.0, 30.0]),
            playback,
            MockSurface::new(),
        );
        (engine, probe)
    }

    fn loaded_engine() -> (TestEngine, PlaybackProbe) {
        let (mut engine, probe) = test_engine();
        engine
            .handle_command(Command::Load {
                path: PathBuf::from("demo.wav"),
            })
            .expect("load should succeed");
        (engine, probe)
    }

    fn analyzed_engine() -> (TestEngine, PlaybackProbe) {
        let (mut engine, probe) = loaded_engine();
        engine
            .handle_command(Command::Analyze)
            .expect("analyze should succeed");
        (engine, probe)
    }

    fn latest_snapshot(events: &[Event]) -> &Snapshot {
        events
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::SessionChanged(snapshot) => Some(snapshot),
                _ => None,
            })
            .expect("events should carry a snapshot")
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("segment-editor-api-{}-{name}", std::process::id()))
    }

    #[test]
    fn load_emits_snapshot_with_audio_and_schedules_a_redraw() {
        let (mut engine, _probe) = test_engine();

        let events = engine
            .handle_command(Command::Load {
                path: PathBuf::from("demo.wav"),
            })
            .expect("load should succeed");

        assert_eq!(events.len(), 2);
        let snapshot = latest_snapshot(&events);
        let audio = snapshot.audio.as_ref().expect("audio should be loaded");
        assert_eq!(audio.path, PathBuf::from("demo.wav"));
        assert!((audio.duration - 30.0).abs() < 1e-9);
        assert!(snapshot.segments.is_empty());
        let view = snapshot.view.expect("view should exist");
        assert_eq!((view.view_start, view.view_end), (0.0, 30.0));
        assert_eq!(events[1], Event::RedrawScheduled);
    }

    #[test]
    fn analyze_groups_detected_boundaries_into_segments() {
        let (mut engine, _probe) = loaded_engine();

        let events = engine
            .handle_command(Command::Analyze)
            .expect("analyze should succeed");

        let snapshot = latest_snapshot(&events);
        let spans: Vec<(f64, f64)> = snapshot
            .segments
            .iter()
            .map(|segment| (segment.start, segment.end))
            .collect();
        assert_eq!(spans, vec![(0.0, 9.0), (9.0, 18.0), (18.0, 30.0)]);
        assert_eq!(snapshot.segments[0].label, "segment_0");
    }

    #[test]
    fn analyze_without_audio_is_rejected() {
        let (mut engine, _probe) = test_engine();
        assert!(matches!(
            engine.handle_command(Command::Analyze),
            Err(EngineError::AudioNotLoaded)
        ));
    }

    #[test]
    fn failed_analysis_keeps_existing_segments() {
        let (mut engine, _probe) = analyzed_engine();
        engine.beats.set_times(vec![4.0]);

        let result = engine.handle_command(Command::Analyze);

        assert!(matches!(
            result,
            Err(EngineError::InsufficientBoundaries { count: 1 })
        ));
        let events = engine
            .handle_command(Command::Select { indices: vec![] })
            .expect("select should succeed");
        assert_eq!(latest_snapshot(&events).segments.len(), 3);
    }

    #[test]
    fn press_near_an_edge_starts_a_drag_that_moves_the_boundary() {
        let (mut engine, _probe) = analyzed_engine();

        engine
            .handle_command(Command::PointerPressed { time: 9.02 })
            .expect("press should succeed");
        let events = engine
            .handle_command(Command::PointerDragged { time: 5.0 })
            .expect("drag should succeed");

        assert_eq!(
            events[0],
            Event::BoundaryMoved {
                index: 0,
                edge: Edge::End,
                time: 5.0
            }
        );

        let events = engine
            .handle_command(Command::PointerReleased)
            .expect("release should succeed");
        let snapshot = latest_snapshot(&events);
        assert_eq!(snapshot.segments[0].end, 5.0);
        // The tie at the shared boundary went to the earlier segment's end;
        // the next segment's start is untouched.
        assert_eq!(snapshot.segments[1].start, 9.0);
    }

    #[test]
    fn press_far_from_any_edge_does_not_start_a_drag() {
        let (mut engine, _probe) = analyzed_engine();

        engine
            .handle_command(Command::PointerPressed { time: 4.0 })
            .expect("press should succeed");
        let events = engine
            .handle_command(Command::PointerDragged { time: 6.0 })
            .expect("drag should succeed");

        assert!(events.is_empty());
    }

    #[test]
    fn drag_without_a_prior_press_is_ignored() {
        let (mut engine, _probe) = analyzed_engine();
        let events = engine
            .handle_command(Command::PointerDragged { time: 6.0 })
            .expect("drag should succeed");
        assert!(events.is_empty());
        assert!(
            engine
                .handle_command(Command::PointerReleased)
                .expect("release should succeed")
                .is_empty()
        );
    }

    #[test]
    fn zoom_command_resizes_the_view_around_its_center() {
        let (mut engine, _probe) = loaded_engine();

        let events = engine
            .handle_command(Command::Zoom { percent: 500 })
            .expect("zoom should succeed");

        let view = latest_snapshot(&events).view.expect("view should exist");
        assert!((view.view_start - 12.0).abs() < 1e-9);
        assert!((view.view_end - 18.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_percent_outside_the_range_is_clamped() {
        let (mut engine, _probe) = loaded_engine();

        let events = engine
            .handle_command(Command::Zoom { percent: 0 })
            .expect("zoom should succeed");

        let view = latest_snapshot(&events).view.expect("view should exist");
        assert_eq!((view.view_start, view.view_end), (0.0, 30.0));
    }

    #[test]
    fn scroll_command_repositions_the_window_within_bounds() {
        let (mut engine, _probe) = loaded_engine();
        engine
            .handle_command(Command::Zoom { percent: 500 })
            .expect("zoom should succeed");

        let events = engine
            .handle_command(Command::Scroll { fraction: 1.0 })
            .expect("scroll should succeed");

        let view = latest_snapshot(&events).view.expect("view should exist");
        assert!((view.view_start - 24.0).abs() < 1e-9);
        assert!((view.view_end - 30.0).abs() < 1e-9);
    }

    #[test]
    fn select_updates_the_selection_after_sorting_and_deduplication() {
        let (mut engine, _probe) = analyzed_engine();

        let events = engine
            .handle_command(Command::Select {
                indices: vec![2, 0, 2],
            })
            .expect("select should succeed");

        assert_eq!(latest_snapshot(&events).selection, vec![0, 2]);
    }

    #[test]
    fn select_with_an_out_of_range_index_is_rejected() {
        let (mut engine, _probe) = analyzed_engine();
        assert!(matches!(
            engine.handle_command(Command::Select { indices: vec![7] }),
            Err(EngineError::InvalidIndex { index: 7, len: 3 })
        ));
    }

    #[test]
    fn rename_command_updates_the_label() {
        let (mut engine, _probe) = analyzed_engine();

        let events = engine
            .handle_command(Command::Rename {
                index: 1,
                label: "chorus".into(),
            })
            .expect("rename should succeed");

        assert_eq!(latest_snapshot(&events).segments[1].label, "chorus");
    }

    #[test]
    fn rename_with_an_empty_label_emits_nothing() {
        let (mut engine, _probe) = analyzed_engine();
        let events = engine
            .handle_command(Command::Rename {
                index: 1,
                label: "  ".into(),
            })
            .expect("rename should succeed");
        assert!(events.is_empty());
    }

    #[test]
    fn merge_selected_replaces_the_segments_and_clears_the_selection() {
        let (mut engine, _probe) = analyzed_engine();
        engine
            .handle_command(Command::Select {
                indices: vec![0, 1],
            })
            .expect("select should succeed");

        let events = engine
            .handle_command(Command::MergeSelected { label: None })
            .expect("merge should succeed");

        let snapshot = latest_snapshot(&events);
        assert_eq!(snapshot.segments.len(), 2);
        assert_eq!(
            (snapshot.segments[0].start, snapshot.segments[0].end),
            (0.0, 18.0)
        );
        assert_eq!(snapshot.segments[0].label, "segment_0");
        assert!(snapshot.selection.is_empty());
    }

    #[test]
    fn merge_with_fewer_than_two_selected_is_rejected() {
        let (mut engine, _probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");

        assert!(matches!(
            engine.handle_command(Command::MergeSelected { label: None }),
            Err(EngineError::InsufficientSelection { count: 1 })
        ));
    }

    #[test]
    fn play_loads_the_selected_segment_clip_and_starts_the_session() {
        let (mut engine, probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");

        let events = engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        let loads = probe.loads.lock().expect("lock loads");
        assert_eq!(*loads, vec![(900, SAMPLE_RATE)]);
        assert_eq!(*probe.plays.lock().expect("lock plays"), vec![0.0]);

        let playback = latest_snapshot(&events)
            .playback
            .expect("session should be running");
        assert_eq!(playback.segment_index, 1);
        assert_eq!(playback.cursor, 9.0);
        assert_eq!(playback.segment_duration, 9.0);
    }

    #[test]
    fn play_without_a_selection_is_rejected() {
        let (mut engine, _probe) = analyzed_engine();
        assert!(matches!(
            engine.handle_command(Command::PlaySelected),
            Err(EngineError::NoSegmentSelected)
        ));
    }

    #[test]
    fn backend_failure_during_play_aborts_without_a_session() {
        let (mut engine, _probe) = analyzed_engine();
        engine.playback.fail_plays = true;
        engine
            .handle_command(Command::Select { indices: vec![0] })
            .expect("select should succeed");

        assert!(engine.handle_command(Command::PlaySelected).is_err());

        let events = engine
            .handle_command(Command::Select { indices: vec![] })
            .expect("select should succeed");
        assert!(latest_snapshot(&events).playback.is_none());
    }

    #[test]
    fn tick_reports_progress_with_the_absolute_cursor() {
        let (mut engine, probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");
        engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        probe.push_position(500);
        let events = engine
            .handle_command(Command::Tick)
            .expect("tick should succeed");

        assert_eq!(
            events[0],
            Event::PlaybackProgress {
                cursor: 9.5,
                elapsed: 0.5
            }
        );
    }

    #[test]
    fn tick_with_the_finished_sentinel_ends_the_session() {
        let (mut engine, probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");
        engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        probe.push_position(FINISHED_SENTINEL);
        let events = engine
            .handle_command(Command::Tick)
            .expect("tick should succeed");

        assert!(latest_snapshot(&events).playback.is_none());
        assert!(*probe.stops.lock().expect("lock stops") >= 1);

        // Stopping cancels further polling: a stale tick is a no-op.
        assert!(
            engine
                .handle_command(Command::Tick)
                .expect("tick should succeed")
                .is_empty()
        );
    }

    #[test]
    fn stop_halts_the_backend_and_clears_the_cursor() {
        let (mut engine, probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![0] })
            .expect("select should succeed");
        engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        let events = engine
            .handle_command(Command::Stop)
            .expect("stop should succeed");

        assert!(latest_snapshot(&events).playback.is_none());
        assert_eq!(*probe.stops.lock().expect("lock stops"), 1);
    }

    #[test]
    fn seek_with_offset_support_restarts_at_the_offset() {
        let (mut engine, probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");
        engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        let events = engine
            .handle_command(Command::Seek { offset_seconds: 3.0 })
            .expect("seek should succeed");

        assert_eq!(*probe.plays.lock().expect("lock plays"), vec![0.0, 3.0]);
        assert_eq!(
            events[0],
            Event::PlaybackProgress {
                cursor: 12.0,
                elapsed: 3.0
            }
        );

        probe.push_position(3_500);
        let events = engine
            .handle_command(Command::Tick)
            .expect("tick should succeed");
        assert_eq!(
            events[0],
            Event::PlaybackProgress {
                cursor: 12.5,
                elapsed: 3.5
            }
        );
    }

    #[test]
    fn seek_without_offset_support_falls_back_and_rebases_the_display() {
        let (mut engine, probe) = analyzed_engine();
        engine.playback.seek_supported = false;
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");
        engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        let events = engine
            .handle_command(Command::Seek { offset_seconds: 3.0 })
            .expect("seek should succeed");

        // The failed offset start is followed by a restart from zero.
        assert_eq!(*probe.plays.lock().expect("lock plays"), vec![0.0, 0.0]);
        assert_eq!(
            events[0],
            Event::PlaybackProgress {
                cursor: 12.0,
                elapsed: 3.0
            }
        );

        // One second of real playback displays as offset plus one second,
        // even though the audible position is one second into the segment.
        probe.push_position(1_000);
        let events = engine
            .handle_command(Command::Tick)
            .expect("tick should succeed");
        assert_eq!(
            events[0],
            Event::PlaybackProgress {
                cursor: 13.0,
                elapsed: 4.0
            }
        );
    }

    #[test]
    fn seek_offset_is_clamped_to_the_segment_duration() {
        let (mut engine, _probe) = analyzed_engine();
        engine
            .handle_command(Command::Select { indices: vec![1] })
            .expect("select should succeed");
        engine
            .handle_command(Command::PlaySelected)
            .expect("play should succeed");

        let events = engine
            .handle_command(Command::Seek {
                offset_seconds: 50.0,
            })
            .expect("seek should succeed");

        assert_eq!(
            events[0],
            Event::PlaybackProgress {
                cursor: 18.0,
                elapsed: 9.0
            }
        );
    }

    #[test]
    fn seek_while_idle_is_ignored() {
        let (mut engine, _probe) = analyzed_engine();
        assert!(
            engine
                .handle_command(Command::Seek { offset_seconds: 1.0 })
                .expect("seek should succeed")
                .is_empty()
        );
    }

    #[test]
    fn redraws_are_coalesced_until_the_flush() {
        let (mut engine, _probe) = loaded_engine();

        // Load already scheduled a redraw; further mutations must not
        // schedule another one while it is pending.
        let events = engine
            .handle_command(Command::Zoom { percent: 500 })
            .expect("zoom should succeed");
        assert!(!events.contains(&Event::RedrawScheduled));

        let events = engine
            .handle_command(Command::Redraw)
            .expect("redraw should succeed");
        let Event::RenderReady(model) = &events[0] else {
            panic!("flush must produce a render model");
        };
        // The zoom that landed during the pending window is visible.
        assert!((model.view_start - 12.0).abs() < 1e-9);
        assert!((model.view_end - 18.0).abs() < 1e-9);

        // After the flush the next mutation schedules again.
        let events = engine
            .handle_command(Command::Scroll { fraction: 0.0 })
            .expect("scroll should succeed");
        assert!(events.contains(&Event::RedrawScheduled));
    }

    #[test]
    fn redraw_without_audio_renders_nothing() {
        let (mut engine, _probe) = test_engine();
        assert!(
            engine
                .handle_command(Command::Redraw)
                .expect("redraw should succeed")
                .is_empty()
        );
    }

    #[test]
    fn export_csv_writes_the_segment_rows() {
        let (mut engine, _probe) = analyzed_engine();
        let path = temp_path("export.csv");

        let events = engine
            .handle_command(Command::ExportCsv { path: path.clone() })
            .expect("export should succeed");

        assert_eq!(events, vec![Event::ExportFinished { path: path.clone() }]);
        let content = std::fs::read_to_string(&path).expect("read back csv");
        std::fs::remove_file(&path).ok();
        assert!(content.starts_with("Start,End,Label\n00:00,00:09,segment_0\n"));
    }

    #[test]
    fn export_png_draws_the_full_view_regardless_of_zoom() {
        let (mut engine, _probe) = analyzed_engine();
        engine
            .handle_command(Command::Zoom { percent: 1_000 })
            .expect("zoom should succeed");
        let path = temp_path("export.png");

        let events = engine
            .handle_command(Command::ExportPng { path: path.clone() })
            .expect("export should succeed");

        assert_eq!(events, vec![Event::ExportFinished { path }]);
        let draws = engine.surface.draws.lock().expect("lock draws");
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].view_start, 0.0);
        assert!((draws[0].view_end - 30.0).abs() < 1e-9);
        assert_eq!(draws[0].cursor, None);
    }

    #[test]
    fn save_and_open_round_trip_restores_segments() {
        let (mut engine, _probe) = analyzed_engine();
        let path = temp_path("project.json");
        engine
            .handle_command(Command::SaveProject { path: path.clone() })
            .expect("save should succeed");

        let (mut reopened, _probe) = test_engine();
        let events = reopened
            .handle_command(Command::OpenProject { path: path.clone() })
            .expect("open should succeed");
        std::fs::remove_file(&path).ok();

        let snapshot = latest_snapshot(&events);
        assert_eq!(snapshot.segments.len(), 3);
        assert!(snapshot.selection.is_empty());
        assert_eq!(
            snapshot.audio.as_ref().expect("audio should be loaded").path,
            PathBuf::from("demo.wav")
        );
    }

    #[test]
    fn opening_a_project_that_outruns_the_audio_is_rejected() {
        let (mut engine, _probe) = analyzed_engine();
        let path = temp_path("stale-project.json");
        engine
            .handle_command(Command::SaveProject { path: path.clone() })
            .expect("save should succeed");

        // The audio file was replaced by a shorter recording since the
        // project was saved.
        let playback = MockPlayback::new(true);
        let mut reopened = Engine::new(
            MockDecoder::new(vec![0.1; 500]),
            MockBeats::new(Vec::new()),
            playback,
            MockSurface::new(),
        );
        let result = reopened.handle_command(Command::OpenProject { path: path.clone() });
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(EngineError::InvalidProjectFile { .. })));
    }

    #[derive(Debug, Clone)]
    struct MockDecoder {
        samples: Vec<f32>,
    }

    impl MockDecoder {
        fn new(samples: Vec<f32>) -> Self {
            Self { samples }
        }

        fn thirty_seconds() -> Self {
            Self::new(vec![0.1; (30 * SAMPLE_RATE) as usize])
        }
    }

    impl AudioDecoder for MockDecoder {
        fn load(&self, _path: &Path) -> Result<DecodedAudio> {
            Ok(DecodedAudio {
                samples: self.samples.clone(),
                sample_rate: SAMPLE_RATE,
            })
        }
    }

    #[derive(Debug, Clone)]
    struct MockBeats {
        times: Arc<Mutex<Vec<f64>>>,
    }

    impl MockBeats {
        fn new(times: Vec<f64>) -> Self {
            Self {
                times: Arc::new(Mutex::new(times)),
            }
        }

        fn set_times(&self, times: Vec<f64>) {
            *self.times.lock().expect("lock times") = times;
        }
    }

    impl BeatDetector for MockBeats {
        fn detect(&self, _samples: &[f32], _sample_rate: u32) -> Vec<f64> {
            self.times.lock().expect("lock times").clone()
        }
    }

    /// Shared handles into the mock playback backend's recorded calls.
    struct PlaybackProbe {
        loads: Arc<Mutex<Vec<(usize, u32)>>>,
        plays: Arc<Mutex<Vec<f64>>>,
        stops: Arc<Mutex<usize>>,
        positions: Arc<Mutex<Vec<i64>>>,
    }

    impl PlaybackProbe {
        fn push_position(&self, position: i64) {
            self.positions.lock().expect("lock positions").push(position);
        }
    }

    #[derive(Debug)]
    struct MockPlayback {
        loads: Arc<Mutex<Vec<(usize, u32)>>>,
        plays: Arc<Mutex<Vec<f64>>>,
        stops: Arc<Mutex<usize>>,
        positions: Arc<Mutex<Vec<i64>>>,
        seek_supported: bool,
        fail_plays: bool,
    }

    impl MockPlayback {
        fn new(seek_supported: bool) -> Self {
            Self {
                loads: Arc::new(Mutex::new(Vec::new())),
                plays: Arc::new(Mutex::new(Vec::new())),
                stops: Arc::new(Mutex::new(0)),
                positions: Arc::new(Mutex::new(Vec::new())),
                seek_supported,
                fail_plays: false,
            }
        }

        fn probe(&self) -> PlaybackProbe {
            PlaybackProbe {
                loads: Arc::clone(&self.loads),
                plays: Arc::clone(&self.plays),
                stops: Arc::clone(&self.stops),
                positions: Arc::clone(&self.positions),
            }
        }
    }

    impl PlaybackEngine for MockPlayback {
        fn load_clip(&mut self, samples: &[f32], sample_rate: u32) -> Result<()> {
            self.loads
                .lock()
                .expect("lock loads")
                .push((samples.len(), sample_rate));
            Ok(())
        }

        fn play(&mut self, start_offset: f64) -> Result<()> {
            if self.fail_plays {
                return Err(EngineError::Media(
                    media_audio::MediaAudioError::NoClipLoaded,
                ));
            }
            if start_offset > 0.0 && !self.seek_supported {
                return Err(EngineError::SeekUnsupported);
            }
            self.plays.lock().expect("lock plays").push(start_offset);
            Ok(())
        }

        fn stop(&mut self) {
            *self.stops.lock().expect("lock stops") += 1;
        }

        fn position_millis(&mut self) -> i64 {
            self.positions
                .lock()
                .expect("lock positions")
                .pop()
                .unwrap_or(0)
        }
    }

    #[derive(Debug)]
    struct MockSurface {
        draws: Arc<Mutex<Vec<RenderModel>>>,
    }

    impl MockSurface {
        fn new() -> Self {
            Self {
                draws: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl RenderSurface for MockSurface {
        fn draw(&mut self, model: &RenderModel, _target: &Path) -> Result<()> {
            self.draws.lock().expect("lock draws").push(model.clone());
            Ok(())
        }
    }
}
