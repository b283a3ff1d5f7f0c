use engine::RenderModel;
use iced::widget::canvas::{self, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Length, Point, Rectangle, Size, Theme, alignment, mouse};

const WAVEFORM_HEIGHT: f32 = 200.0;

/// Pointer interactions emitted by the waveform canvas, in timeline seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveformEvent {
    Pressed(f64),
    Dragged(f64),
    Released,
}

/// Maps an x position inside the widget to a time inside the view window.
///
/// # Example
/// ```ignore
/// assert_eq!(time_from_x(0.0, 200.0, 4.0, 8.0), 4.0);
/// assert_eq!(time_from_x(100.0, 200.0, 4.0, 8.0), 6.0);
/// assert_eq!(time_from_x(250.0, 200.0, 4.0, 8.0), 8.0);
/// ```
pub fn time_from_x(x: f32, width: f32, view_start: f64, view_end: f64) -> f64 {
    if width <= 0.0 || view_end <= view_start {
        return view_start;
    }
    let ratio = (x / width).clamp(0.0, 1.0) as f64;
    view_start + ratio * (view_end - view_start)
}

/// Maps a time inside the view window to an x position inside the widget.
pub fn x_from_time(time: f64, width: f32, view_start: f64, view_end: f64) -> f32 {
    if view_end <= view_start {
        return 0.0;
    }
    let ratio = ((time - view_start) / (view_end - view_start)).clamp(0.0, 1.0);
    ratio as f32 * width
}

#[derive(Debug, Default)]
struct WaveformState {
    dragging: bool,
}

struct WaveformProgram<'a, Message> {
    model: &'a RenderModel,
    cache: &'a canvas::Cache,
    on_event: fn(WaveformEvent) -> Message,
}

impl<Message> canvas::Program<Message> for WaveformProgram<'_, Message> {
    type State = WaveformState;

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        let cursor_x = cursor.position().map(|position| position.x - bounds.x);
        let time_at = |x: f32| {
            time_from_x(x, bounds.width, self.model.view_start, self.model.view_end)
        };

        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let Some(x) = cursor_x else {
                    return (canvas::event::Status::Ignored, None);
                };
                state.dragging = true;
                (
                    canvas::event::Status::Captured,
                    Some((self.on_event)(WaveformEvent::Pressed(time_at(x)))),
                )
            }
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) if state.dragging => {
                let Some(x) = cursor_x else {
                    return (canvas::event::Status::Ignored, None);
                };
                (
                    canvas::event::Status::Captured,
                    Some((self.on_event)(WaveformEvent::Dragged(time_at(x)))),
                )
            }
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if !state.dragging {
                    return (canvas::event::Status::Ignored, None);
                }
                state.dragging = false;
                (
                    canvas::event::Status::Captured,
                    Some((self.on_event)(WaveformEvent::Released)),
                )
            }
            _ => (canvas::event::Status::Ignored, None),
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let base = self.cache.draw(renderer, bounds.size(), |frame| {
            let background = Path::rectangle(Point::ORIGIN, frame.size());
            frame.fill(&background, Color::from_rgb8(22, 24, 29));

            draw_segments(self.model, frame, bounds);
            draw_envelope(self.model, frame, bounds);
        });

        let mut overlay = canvas::Frame::new(renderer, bounds.size());
        if let Some(cursor) = self.model.cursor {
            let x = x_from_time(
                cursor,
                bounds.width,
                self.model.view_start,
                self.model.view_end,
            );
            let line = Path::line(Point::new(x, 0.0), Point::new(x, bounds.height));
            overlay.stroke(
                &line,
                Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::from_rgb8(255, 94, 77)),
            );
        }

        vec![base, overlay.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::None
        }
    }
}

fn draw_segments(model: &RenderModel, frame: &mut canvas::Frame, bounds: Rectangle) {
    for span in &model.segments {
        let x0 = x_from_time(span.draw_start, bounds.width, model.view_start, model.view_end);
        let x1 = x_from_time(span.draw_end, bounds.width, model.view_start, model.view_end);
        let rect = Path::rectangle(
            Point::new(x0, 0.0),
            Size::new((x1 - x0).max(1.0), bounds.height),
        );
        frame.fill(&rect, Color::from_rgba8(255, 165, 0, 0.25));

        frame.fill_text(canvas::Text {
            content: span.label.clone(),
            position: Point::new((x0 + x1) / 2.0, bounds.height * 0.15),
            color: Color::from_rgb8(235, 235, 235),
            size: iced::Pixels(12.0),
            horizontal_alignment: alignment::Horizontal::Center,
            ..canvas::Text::default()
        });

        for boundary in [span.start_boundary, span.end_boundary].into_iter().flatten() {
            let x = x_from_time(boundary, bounds.width, model.view_start, model.view_end);
            let line = Path::line(Point::new(x, 0.0), Point::new(x, bounds.height));
            frame.stroke(
                &line,
                Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::from_rgb8(64, 120, 255)),
            );
        }
    }
}

fn draw_envelope(model: &RenderModel, frame: &mut canvas::Frame, bounds: Rectangle) {
    if model.envelope.len() < 2 {
        return;
    }
    let peak = model
        .envelope
        .iter()
        .map(|point| point.amplitude.abs())
        .fold(0.0_f32, f32::max)
        .max(f32::EPSILON);
    let mid = bounds.height / 2.0;

    let path = Path::new(|builder| {
        let mut points = model.envelope.iter().map(|point| {
            Point::new(
                x_from_time(point.time, bounds.width, model.view_start, model.view_end),
                mid - point.amplitude / peak * (mid - 4.0),
            )
        });
        if let Some(first) = points.next() {
            builder.move_to(first);
        }
        for point in points {
            builder.line_to(point);
        }
    });
    frame.stroke(
        &path,
        Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgba8(220, 220, 220, 0.8)),
    );
}

/// Renders the interactive waveform canvas, or a placeholder before load.
pub fn view<'a, Message>(
    model: Option<&'a RenderModel>,
    cache: &'a canvas::Cache,
    on_event: fn(WaveformEvent) -> Message,
) -> Element<'a, Message>
where
    Message: 'a,
{
    let Some(model) = model else {
        return container(iced::widget::text("no audio loaded"))
            .width(Length::Fill)
            .height(Length::Fixed(WAVEFORM_HEIGHT))
            .center_x(Length::Fill)
            .center_y(Length::Fixed(WAVEFORM_HEIGHT))
            .into();
    };

    container(
        canvas::Canvas::new(WaveformProgram {
            model,
            cache,
            on_event,
        })
        .width(Length::Fill)
        .height(Length::Fixed(WAVEFORM_HEIGHT)),
    )
    .width(Length::Fill)
    .into()
}
