//! Built-in apps. The registry is static: everything the daemon can
//! run is linked in here.

mod banner;
mod glitch;
mod pattern;

pub use banner::BannerApp;
pub use glitch::GlitchApp;
pub use pattern::PatternApp;

use visor_engine::App;

/// All registered apps, in listing order.
pub fn registry() -> Vec<Box<dyn App>> {
    vec![
        Box::new(GlitchApp),
        Box::new(BannerApp::new()),
        Box::new(PatternApp::new()),
    ]
}
