use iced::mouse;
use iced::widget::canvas::{self, Event, Frame, Geometry, Path, Stroke, Text};
use iced::{Color, Font, Point, Rectangle, Renderer, Size, Theme};

use crate::aggregate::Comparison;

const PAD_LEFT: f32 = 44.0;
const PAD_RIGHT: f32 = 12.0;
const PAD_TOP: f32 = 30.0;
const PAD_BOTTOM: f32 = 44.0;

/// Bar centers inside a category slot, as a fraction of the slot width.
const RELEASE_OFFSET: f32 = 0.3;
const BETA_OFFSET: f32 = 0.7;
const BAR_WIDTH: f32 = 0.4;

/// Approximate glyph advance used to fit labels.
const CHAR_W: f32 = 6.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Release,
    Beta,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Release => "Release",
            Channel::Beta => "Beta",
        }
    }
}

/// Hover state: the bar under the cursor, if any.
#[derive(Debug, Clone, Default)]
pub struct ChartState {
    pub hover: Option<(usize, Channel)>,
}

/// Colors the chart needs from the active palette.
#[derive(Debug, Clone, Copy)]
pub struct ChartColors {
    pub bg: Color,
    pub border: Color,
    pub grid: Color,
    pub label: Color,
    pub text: Color,
    pub release: Color,
    pub beta: Color,
}

/// Release vs beta grouped bar chart drawn via iced Canvas.
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub data: Comparison,
    pub colors: ChartColors,
}

/// Plot area inside the canvas bounds.
fn plot_area(size: Size) -> Rectangle {
    Rectangle {
        x: PAD_LEFT,
        y: PAD_TOP,
        width: size.width - PAD_LEFT - PAD_RIGHT,
        height: size.height - PAD_TOP - PAD_BOTTOM,
    }
}

impl BarChart {
    /// Top of the y axis; never zero so empty plots still get a scale.
    fn axis_max(&self) -> f32 {
        if self.data.y_max > 0.0 { self.data.y_max } else { 1.0 }
    }

    fn value(&self, idx: usize, channel: Channel) -> f32 {
        let series = match channel {
            Channel::Release => &self.data.release,
            Channel::Beta => &self.data.beta,
        };
        series.get(idx).copied().unwrap_or(0.0)
    }

    /// Bar rectangle for a category and channel.
    fn bar_rect(&self, area: Rectangle, idx: usize, channel: Channel) -> Rectangle {
        let n = self.data.labels.len().max(1);
        let slot_w = area.width / n as f32;
        let offset = match channel {
            Channel::Release => RELEASE_OFFSET,
            Channel::Beta => BETA_OFFSET,
        };
        let center = area.x + slot_w * (idx as f32 + offset);
        let h = area.height * (self.value(idx, channel) / self.axis_max()).clamp(0.0, 1.0);
        Rectangle {
            x: center - slot_w * BAR_WIDTH / 2.0,
            y: area.y + area.height - h,
            width: slot_w * BAR_WIDTH,
            height: h,
        }
    }

    /// Which bar column sits under `pos` (canvas-relative). The whole column
    /// above a bar counts, so short bars stay easy to hover.
    pub fn bar_at(&self, size: Size, pos: Point) -> Option<(usize, Channel)> {
        let area = plot_area(size);
        let n = self.data.labels.len();
        if n == 0 || area.width <= 0.0 || area.height <= 0.0 {
            return None;
        }
        if pos.y < area.y || pos.y > area.y + area.height {
            return None;
        }
        let slot_w = area.width / n as f32;
        let rel = pos.x - area.x;
        if rel < 0.0 || rel >= area.width {
            return None;
        }
        let idx = ((rel / slot_w) as usize).min(n - 1);
        let frac = rel / slot_w - idx as f32;
        let half = BAR_WIDTH / 2.0;
        if (frac - RELEASE_OFFSET).abs() <= half {
            Some((idx, Channel::Release))
        } else if (frac - BETA_OFFSET).abs() <= half {
            Some((idx, Channel::Beta))
        } else {
            None
        }
    }
}

impl<Message: 'static> canvas::Program<Message> for BarChart {
    type State = ChartState;

    fn update(
        &self,
        state: &mut Self::State,
        event: Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        let hover = match &event {
            Event::Mouse(mouse::Event::CursorMoved { .. }) => cursor
                .position_in(bounds)
                .and_then(|pos| self.bar_at(bounds.size(), pos)),
            Event::Mouse(mouse::Event::CursorLeft) => None,
            _ => return (canvas::event::Status::Ignored, None),
        };
        if hover != state.hover {
            state.hover = hover;
        }
        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.hover.is_some() && cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let c = &self.colors;
        let area = plot_area(bounds.size());

        if area.width <= 0.0 || area.height <= 0.0 {
            return vec![frame.into_geometry()];
        }

        let bg = Path::rectangle(Point::ORIGIN, bounds.size());
        frame.fill(&bg, c.bg);
        let border = Path::rectangle(Point::new(0.5, 0.5), Size::new(bounds.width - 1.0, bounds.height - 1.0));
        frame.stroke(&border, Stroke::default().with_color(c.border).with_width(0.5));

        let mut title = Text::from(self.title.clone());
        title.position = Point::new(PAD_LEFT, 6.0);
        title.color = c.text;
        title.size = 13.0.into();
        frame.fill_text(title);

        // Y-axis labels + grid
        let y_max = self.axis_max();
        let step = nice_tick_step(y_max, 8);
        let mut val = 0.0f32;
        while val <= y_max + step * 0.001 {
            let y = area.y + area.height * (1.0 - val / y_max);
            let grid = Path::line(Point::new(area.x, y), Point::new(area.x + area.width, y));
            frame.stroke(&grid, Stroke::default().with_color(c.grid).with_width(1.0));

            let label_str = if step >= 1.0 { format!("{val:.0}%") } else { format!("{val:.1}%") };
            let mut label = Text::from(label_str);
            label.position = Point::new(4.0, y - 6.0);
            label.color = c.label;
            label.size = 10.0.into();
            label.font = Font::MONOSPACE;
            frame.fill_text(label);

            val += step;
        }

        let n = self.data.labels.len();
        if self.data.is_empty() {
            let mut hint = Text::from("Nothing selected");
            hint.position = Point::new(area.center_x(), area.center_y());
            hint.color = c.label;
            hint.size = 13.0.into();
            hint.horizontal_alignment = iced::alignment::Horizontal::Center;
            hint.vertical_alignment = iced::alignment::Vertical::Center;
            frame.fill_text(hint);
        }

        // Bars
        for idx in 0..n {
            for (channel, color) in [(Channel::Release, c.release), (Channel::Beta, c.beta)] {
                let r = self.bar_rect(area, idx, channel);
                if r.height <= 0.0 {
                    continue;
                }
                let highlighted = state.hover == Some((idx, channel));
                let fill = if highlighted {
                    color
                } else {
                    Color::from_rgba(color.r, color.g, color.b, 0.8)
                };
                frame.fill(&Path::rectangle(r.position(), r.size()), fill);
            }
        }

        // Category labels, staggered onto two rows when slots get narrow
        if n > 0 {
            let slot_w = area.width / n as f32;
            let stagger = slot_w < 70.0;
            let room = if stagger { slot_w * 2.0 } else { slot_w };
            let max_chars = ((room - 4.0) / CHAR_W).floor().max(1.0) as usize;
            for (idx, name) in self.data.labels.iter().enumerate() {
                let row = if stagger { (idx % 2) as f32 } else { 0.0 };
                let mut label = Text::from(truncate_label(name, max_chars));
                label.position = Point::new(
                    area.x + slot_w * (idx as f32 + 0.5),
                    area.y + area.height + 6.0 + row * 16.0,
                );
                label.color = c.label;
                label.size = 10.0.into();
                label.horizontal_alignment = iced::alignment::Horizontal::Center;
                frame.fill_text(label);
            }
        }

        // Tooltip
        if let Some((idx, channel)) = state.hover {
            if idx < n {
                let r = self.bar_rect(area, idx, channel);
                let heading = format!("{} ({})", self.data.labels[idx], channel.label());
                let body = format!("Users: {:.1} %", self.value(idx, channel));
                let text_w = heading.chars().count().max(body.chars().count()) as f32 * CHAR_W + 16.0;
                let tx = (r.x + r.width + 6.0).min(area.x + area.width - text_w).max(0.0);
                let ty = (r.y - 40.0).max(area.y);

                let box_path = Path::rectangle(Point::new(tx, ty), Size::new(text_w, 36.0));
                frame.fill(&box_path, Color::from_rgba(c.bg.r, c.bg.g, c.bg.b, 0.95));
                let color = match channel {
                    Channel::Release => c.release,
                    Channel::Beta => c.beta,
                };
                frame.stroke(&box_path, Stroke::default().with_color(color).with_width(0.8));

                let mut head = Text::from(heading);
                head.position = Point::new(tx + 8.0, ty + 3.0);
                head.color = c.text;
                head.size = 11.0.into();
                frame.fill_text(head);

                let mut value = Text::from(body);
                value.position = Point::new(tx + 8.0, ty + 19.0);
                value.color = color;
                value.size = 11.0.into();
                value.font = Font::MONOSPACE;
                frame.fill_text(value);
            }
        }

        // Legend (top-right)
        let mut lx = bounds.width - PAD_RIGHT;
        for (name, color) in [(Channel::Beta.label(), c.beta), (Channel::Release.label(), c.release)] {
            lx -= name.len() as f32 * CHAR_W + 22.0;
            let swatch = Path::rectangle(Point::new(lx, 9.0), Size::new(10.0, 10.0));
            frame.fill(&swatch, color);
            let mut lt = Text::from(name);
            lt.position = Point::new(lx + 14.0, 6.0);
            lt.color = c.label;
            lt.size = 11.0.into();
            frame.fill_text(lt);
        }

        vec![frame.into_geometry()]
    }
}

/// Shorten `label` to at most `max_chars` characters, marking the cut.
fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = label.chars().take(keep).collect();
    out.push('…');
    out
}

/// Pick a "nice" tick step (1, 2, 5, 10, 20, 50, …) so that the range
/// is divided into at most `max_ticks` intervals.
fn nice_tick_step(range: f32, max_ticks: usize) -> f32 {
    let rough = range / max_ticks as f32;
    let mag = 10f32.powf(rough.log10().floor());
    let norm = rough / mag;
    let nice = if norm <= 1.0 { 1.0 } else if norm <= 2.0 { 2.0 } else if norm <= 5.0 { 5.0 } else { 10.0 };
    (nice * mag).max(f32::EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> ChartColors {
        ChartColors {
            bg: Color::BLACK,
            border: Color::BLACK,
            grid: Color::BLACK,
            label: Color::WHITE,
            text: Color::WHITE,
            release: Color::from_rgb(1.0, 0.5, 0.0),
            beta: Color::from_rgb(0.0, 0.0, 1.0),
        }
    }

    fn chart(labels: &[&str]) -> BarChart {
        let labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        let counts: Vec<f64> = (1..=labels.len()).map(|i| i as f64 * 10.0).collect();
        BarChart {
            title: "test".into(),
            data: Comparison::new(labels, &counts, 100.0, &counts, 200.0),
            colors: colors(),
        }
    }

    #[test]
    fn test_nice_tick_step() {
        assert_eq!(nice_tick_step(100.0, 10), 10.0);
        assert_eq!(nice_tick_step(70.0, 8), 10.0);
        assert!((nice_tick_step(1.0, 8) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Intel", 10), "Intel");
        assert_eq!(truncate_label("NVIDIA Corporation", 7), "NVIDIA…");
        assert_eq!(truncate_label("abc", 0), "…");
    }

    #[test]
    fn test_bar_hit_testing() {
        let c = chart(&["a", "b"]);
        // Plot area: x 44..444, y 30..256 for a 456x300 canvas; slots are 200px wide.
        let size = Size::new(456.0, 300.0);
        let y = 200.0;
        assert_eq!(c.bar_at(size, Point::new(44.0 + 60.0, y)), Some((0, Channel::Release)));
        assert_eq!(c.bar_at(size, Point::new(44.0 + 140.0, y)), Some((0, Channel::Beta)));
        assert_eq!(c.bar_at(size, Point::new(44.0 + 260.0, y)), Some((1, Channel::Release)));
        // Gap at the slot edge.
        assert_eq!(c.bar_at(size, Point::new(44.0 + 10.0, y)), None);
        // Outside the plot.
        assert_eq!(c.bar_at(size, Point::new(10.0, y)), None);
        assert_eq!(c.bar_at(size, Point::new(104.0, 290.0)), None);
    }

    #[test]
    fn test_empty_chart_has_no_bars() {
        let c = chart(&[]);
        assert_eq!(c.axis_max(), 1.0);
        assert_eq!(c.bar_at(Size::new(400.0, 300.0), Point::new(200.0, 100.0)), None);
    }

    #[test]
    fn test_tallest_bar_fills_plot() {
        let c = chart(&["a", "b"]);
        let area = plot_area(Size::new(456.0, 300.0));
        // Release of "b" is 20% which is also y_max.
        let r = c.bar_rect(area, 1, Channel::Release);
        assert!((r.height - area.height).abs() < 1e-3);
        let b = c.bar_rect(area, 1, Channel::Beta);
        assert!((b.height - area.height / 2.0).abs() < 1e-3);
    }
}
