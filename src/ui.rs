use iced::widget::canvas::Canvas;
use iced::widget::{
    button, checkbox, column, container, pick_list, row, scrollable, text, Column, Row, Space,
};
use iced::keyboard;
use iced::{Alignment, Background, Border, Color, Element, Length, Shadow, Subscription, Task, Theme, Vector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chart::{BarChart, ChartColors};
use crate::dataset::{Dataset, Summary};
use crate::loader::{self, DataSource};
use crate::panels::{Panels, Tab};
use crate::preferences::Preferences;
use crate::theme::{build_palette, Palette, ThemeVariant};

const SIDEBAR_WIDTH: f32 = 300.0;

// ─── MESSAGE ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Message {
    DatasetLoaded(Result<Arc<Dataset>, String>),
    Retry,
    Reload,
    TabSelected(Tab),
    Toggle(Tab, String, bool),
    SelectAll(Tab, bool),
    OsSelected(String),
    VendorSelected(String),
    SetTheme(ThemeVariant),
    ExportCsv,
    KeyPressed(keyboard::Key, keyboard::Modifiers),
}

/// Dataset lifecycle.
enum State {
    Loading,
    Failed(String),
    Ready {
        dataset: Arc<Dataset>,
        panels: Panels,
        summary: Summary,
        loaded_at: String,
    },
}

// ─── APP STATE ──────────────────────────────────────────────────

pub struct Sharescope {
    prefs: Preferences,
    source: DataSource,
    state: State,
    tab: Tab,
    pal: Palette,
    status_message: Option<String>,
}

impl Sharescope {
    /// `path` overrides the configured data source.
    pub fn new(path: Option<PathBuf>) -> (Self, Task<Message>) {
        let prefs = Preferences::load();
        let source = match path {
            Some(p) => DataSource::from_path(&p),
            None => DataSource::in_dir(
                &prefs.cache_dir.clone().unwrap_or_else(loader::default_cache_dir),
                prefs.archive_url.clone(),
            ),
        };
        info!(json = %source.json_path.display(), archive = %source.archive_path.display(), "data source");

        let app = Self {
            tab: prefs.last_tab,
            pal: build_palette(prefs.theme),
            prefs,
            source,
            state: State::Loading,
            status_message: None,
        };
        let task = app.load_task();
        (app, task)
    }

    fn load_task(&self) -> Task<Message> {
        let source = self.source.clone();
        Task::perform(
            async move { loader::load(source).await.map(Arc::new).map_err(|e| e.to_string()) },
            Message::DatasetLoaded,
        )
    }

    pub fn title(&self) -> String {
        format!("Sharescope — {}", self.tab.title())
    }

    pub fn theme(&self) -> Theme {
        if self.prefs.theme.is_light() { Theme::Light } else { Theme::Dark }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        keyboard::on_key_press(|key, modifiers| Some(Message::KeyPressed(key, modifiers)))
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::DatasetLoaded(Ok(dataset)) => {
                let panels = Panels::new(&dataset, &self.prefs.default_vendors, self.prefs.reset_count);
                self.state = State::Ready {
                    summary: dataset.summary(),
                    panels,
                    dataset,
                    loaded_at: chrono::Local::now().format("%H:%M:%S").to_string(),
                };
                self.status_message = None;
            }
            Message::DatasetLoaded(Err(e)) => {
                error!("failed to load dataset: {e}");
                self.state = State::Failed(e);
            }
            Message::Retry => {
                self.state = State::Loading;
                return self.load_task();
            }
            Message::Reload => {
                if let Err(e) = loader::invalidate(&self.source) {
                    warn!("could not drop cached dataset: {e}");
                    self.status_message = Some(format!("Reload failed: {e}"));
                    return Task::none();
                }
                self.state = State::Loading;
                return self.load_task();
            }
            Message::TabSelected(tab) => self.select_tab(tab),
            Message::Toggle(tab, label, on) => {
                if let State::Ready { dataset, panels, .. } = &mut self.state {
                    panels.get_mut(tab).toggle(dataset, &label, on);
                }
            }
            Message::SelectAll(tab, on) => {
                if let State::Ready { dataset, panels, .. } = &mut self.state {
                    panels.get_mut(tab).set_all(dataset, on);
                }
            }
            Message::OsSelected(os) => {
                if let State::Ready { dataset, panels, .. } = &mut self.state {
                    panels.os_versions.select_os(dataset, &os);
                }
            }
            Message::VendorSelected(vendor) => {
                if let State::Ready { dataset, panels, .. } = &mut self.state {
                    panels.devices.select_vendor(dataset, &vendor);
                }
            }
            Message::SetTheme(variant) => {
                self.prefs.theme = variant;
                self.pal = build_palette(variant);
                self.prefs.save();
            }
            Message::ExportCsv => self.export_csv(),
            Message::KeyPressed(key, modifiers) => {
                use keyboard::key::Named;
                match key {
                    keyboard::Key::Character(ref c) => match c.as_str() {
                        "1" => self.select_tab(Tab::Oses),
                        "2" => self.select_tab(Tab::OsVersions),
                        "3" => self.select_tab(Tab::Vendors),
                        "4" => self.select_tab(Tab::Devices),
                        _ => {}
                    },
                    keyboard::Key::Named(Named::Tab) if modifiers.shift() => self.select_tab(self.tab.prev()),
                    keyboard::Key::Named(Named::Tab) => self.select_tab(self.tab.next()),
                    _ => {}
                }
            }
        }
        Task::none()
    }

    fn select_tab(&mut self, tab: Tab) {
        if tab == self.tab {
            return;
        }
        self.tab = tab;
        self.prefs.last_tab = tab;
        self.prefs.save();
    }

    fn export_csv(&mut self) {
        let State::Ready { panels, .. } = &self.state else {
            return;
        };
        let csv = panels.get(self.tab).comparison().to_csv();
        let Some(dir) = dirs::download_dir().or_else(dirs::home_dir) else {
            self.status_message = Some("Export failed: no download or home directory".into());
            return;
        };
        let name = format!(
            "sharescope_{}_{}.csv",
            tab_slug(self.tab),
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(name);
        match std::fs::write(&path, csv) {
            Ok(_) => {
                info!(path = %path.display(), "exported view");
                self.status_message = Some(format!("Exported to {}", path.display()));
            }
            Err(e) => self.status_message = Some(format!("Export failed: {e}")),
        }
    }

    fn chart_colors(&self) -> ChartColors {
        ChartColors {
            bg: self.pal.panel_bg,
            border: self.pal.border,
            grid: self.pal.grid,
            label: self.pal.label,
            text: self.pal.text,
            release: self.pal.release,
            beta: self.pal.beta,
        }
    }

    // ─── MAIN VIEW ──────────────────────────────────────────────

    pub fn view(&self) -> Element<'_, Message> {
        let p = &self.pal;

        let tabs = Row::with_children(
            Tab::ALL.iter().map(|&t| menu_tab(t, self.tab, p)),
        )
        .spacing(4);

        let summary_el: Element<Message> = match &self.state {
            State::Ready { summary, loaded_at, .. } => {
                let (release, beta) = match self.tab {
                    Tab::Oses | Tab::OsVersions => (summary.release_users, summary.beta_users),
                    Tab::Vendors | Tab::Devices => (summary.release_gfx_users, summary.beta_gfx_users),
                };
                text(format!(
                    "release {} users · beta {} users · loaded {}",
                    format_count(release),
                    format_count(beta),
                    loaded_at,
                ))
            }
            .size(11)
            .color(p.label)
            .into(),
            _ => Space::new(0, 0).into(),
        };

        let status_el: Element<Message> = match &self.status_message {
            Some(msg) => text(msg).size(11).color(p.yellow).into(),
            None => Space::new(0, 0).into(),
        };

        let theme_picker = pick_list(
            ThemeVariant::ALL,
            Some(self.prefs.theme),
            Message::SetTheme,
        )
        .text_size(12)
        .padding([2, 6]);

        let menu_bar = row![
            text("Sharescope").size(15).color(p.accent),
            Space::with_width(12),
            tabs,
            Space::with_width(Length::Fill),
            status_el,
            Space::with_width(12),
            summary_el,
            Space::with_width(12),
            theme_picker,
        ]
        .align_y(Alignment::Center)
        .padding([6, 12]);

        let content: Element<Message> = match &self.state {
            State::Loading => self.view_message("Loading dataset…", None),
            State::Failed(e) => self.view_message(&format!("Could not load dataset: {e}"), Some(Message::Retry)),
            State::Ready { panels, .. } => self.view_panel(panels),
        };

        let bg = p.bg;
        let main = column![
            header_bg(menu_bar.into(), p.header_bg),
            content,
        ]
        .spacing(0);

        container(main)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(move |_: &Theme| container::Style {
                background: Some(Background::Color(bg)),
                ..Default::default()
            })
            .into()
    }

    fn view_message(&self, msg: &str, action: Option<Message>) -> Element<'_, Message> {
        let p = &self.pal;
        let color = if action.is_some() { p.red } else { p.label };
        let mut col = Column::new()
            .push(text(msg.to_string()).size(14).color(color))
            .spacing(12)
            .align_x(Alignment::Center);
        if let Some(action) = action {
            col = col.push(
                button(text("Retry").size(12))
                    .on_press(action)
                    .style(button::primary)
                    .padding([4, 14]),
            );
        }
        container(col)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn view_panel<'a>(&'a self, panels: &'a Panels) -> Element<'a, Message> {
        let p = &self.pal;
        let tab = self.tab;
        let panel = panels.get(tab);

        let mut controls: Vec<Element<Message>> = Vec::new();
        match tab {
            Tab::OsVersions => {
                controls.push(section_title("OS", p));
                controls.push(
                    pick_list(
                        panels.os_versions.oses(),
                        panels.os_versions.os().cloned(),
                        Message::OsSelected,
                    )
                    .width(Length::Fill)
                    .text_size(12)
                    .into(),
                );
            }
            Tab::Devices => {
                controls.push(section_title("Vendor", p));
                controls.push(
                    pick_list(
                        panels.devices.vendors(),
                        panels.devices.vendor().cloned(),
                        Message::VendorSelected,
                    )
                    .width(Length::Fill)
                    .text_size(12)
                    .into(),
                );
            }
            Tab::Oses | Tab::Vendors => {}
        }

        controls.push(
            row![
                button(text("All").size(11))
                    .on_press(Message::SelectAll(tab, true))
                    .style(button::secondary)
                    .padding([3, 10]),
                button(text("None").size(11))
                    .on_press(Message::SelectAll(tab, false))
                    .style(button::secondary)
                    .padding([3, 10]),
                Space::with_width(Length::Fill),
                button(text("CSV").size(11))
                    .on_press(Message::ExportCsv)
                    .style(button::secondary)
                    .padding([3, 10]),
                button(text("Reload").size(11))
                    .on_press_maybe(self.source.can_refresh().then_some(Message::Reload))
                    .style(button::secondary)
                    .padding([3, 10]),
            ]
            .spacing(4)
            .into(),
        );

        let checks = Column::with_children(panel.list().labels().iter().map(|label| {
            let owned = label.clone();
            checkbox(label.as_str(), panel.list().is_checked(label))
                .on_toggle(move |on| Message::Toggle(tab, owned.clone(), on))
                .text_size(12)
                .size(14)
                .into()
        }))
        .spacing(4);

        let sidebar = column![
            Column::with_children(controls).spacing(6),
            scrollable(checks).height(Length::Fill),
        ]
        .spacing(10)
        .width(SIDEBAR_WIDTH);

        let chart = Canvas::new(BarChart {
            title: tab.chart_title().to_string(),
            data: panel.comparison().clone(),
            colors: self.chart_colors(),
        })
        .width(Length::Fill)
        .height(Length::Fixed(self.prefs.chart_height));

        row![
            panel_box(sidebar.into(), p),
            panel_box(chart.into(), p),
        ]
        .spacing(4)
        .padding(4)
        .height(Length::Fill)
        .into()
    }
}

// ─── HELPER FUNCTIONS ────────────────────────────────────────────

fn tab_slug(tab: Tab) -> &'static str {
    match tab {
        Tab::Oses => "oses",
        Tab::OsVersions => "os_versions",
        Tab::Vendors => "vendors",
        Tab::Devices => "devices",
    }
}

/// Thousands-separated user count.
fn format_count(n: f64) -> String {
    let digits = format!("{:.0}", n.max(0.0));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn panel_box<'a>(content: Element<'a, Message>, p: &Palette) -> Element<'a, Message> {
    let panel_bg = p.panel_bg;
    let border_c = p.border;
    container(content)
        .padding(10)
        .height(Length::Fill)
        .style(move |_: &Theme| container::Style {
            background: Some(Background::Color(panel_bg)),
            border: Border {
                color: border_c,
                width: 1.0,
                radius: 8.0.into(),
            },
            shadow: Shadow {
                color: Color::from_rgba(0.0, 0.0, 0.0, 0.15),
                offset: Vector::new(0.0, 2.0),
                blur_radius: 8.0,
            },
            ..Default::default()
        })
        .into()
}

fn header_bg<'a>(content: Element<'a, Message>, bg: Color) -> Element<'a, Message> {
    container(content)
        .width(Length::Fill)
        .style(move |_: &Theme| container::Style {
            background: Some(Background::Color(bg)),
            ..Default::default()
        })
        .into()
}

fn menu_tab(tab: Tab, current: Tab, p: &Palette) -> Element<'static, Message> {
    let is_active = tab == current;
    let accent = p.accent;
    let text_c = p.text;
    let color = if is_active { accent } else { p.label };
    let hover_color = Color::from_rgba(accent.r, accent.g, accent.b, 0.15);
    button(text(tab.title()).size(12).color(color))
        .on_press(Message::TabSelected(tab))
        .padding([4, 14])
        .style(move |_: &Theme, status| {
            let bg = match status {
                button::Status::Hovered => hover_color,
                button::Status::Pressed => Color::from_rgba(accent.r, accent.g, accent.b, 0.25),
                _ => if is_active { Color::from_rgba(accent.r, accent.g, accent.b, 0.1) } else { Color::TRANSPARENT },
            };
            button::Style {
                background: Some(Background::Color(bg)),
                text_color: text_c,
                border: Border {
                    color: Color::TRANSPARENT,
                    width: 0.0,
                    radius: 6.0.into(),
                },
                ..Default::default()
            }
        })
        .into()
}

fn section_title(label: &'static str, p: &Palette) -> Element<'static, Message> {
    text(label).size(11).color(p.accent).into()
}
