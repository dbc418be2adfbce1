pub mod launcher;

pub use launcher::{connect_browser, launch_browser, LaunchOptions};
