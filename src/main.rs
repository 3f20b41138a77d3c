#![windows_subsystem = "windows"]

mod aggregate;
mod chart;
mod dataset;
mod loader;
mod normalize;
mod panels;
mod preferences;
pub mod theme;
mod ui;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ui::Sharescope;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sharescope=info")),
        )
        .init();

    // Optional dataset path: a .json file or a .tar.gz archive.
    let path = std::env::args_os().nth(1).map(PathBuf::from);

    iced::application(Sharescope::title, Sharescope::update, Sharescope::view)
        .subscription(Sharescope::subscription)
        .theme(Sharescope::theme)
        .window(iced::window::Settings {
            size: (1200.0, 720.0).into(),
            #[cfg(target_os = "linux")]
            platform_specific: iced::window::settings::PlatformSpecific {
                application_id: String::from("sharescope"),
                ..Default::default()
            },
            ..Default::default()
        })
        .run_with(move || Sharescope::new(path))
}
