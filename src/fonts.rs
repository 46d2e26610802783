use crate::bridge::{script, Bridge};
use crate::config::Config;
use std::time::Duration;
use tracing::{info, warn};

/// The font manager, as far as the batch cares about it.
pub trait FontManager {
    fn is_running(&self) -> bool;
    fn open_and_refresh(&self, load_time: Duration) -> bool;
    fn refresh(&self) -> bool;
    fn hide(&self) -> bool;
}

/// Drives the font manager through the automation bridge.
pub struct ScriptedFontManager<'a, B: Bridge> {
    bridge: &'a B,
    app: String,
    timeout: Duration,
    refresh_wait: Duration,
}

impl<'a, B: Bridge> ScriptedFontManager<'a, B> {
    pub fn new(cfg: &Config, bridge: &'a B) -> Self {
        Self {
            bridge,
            app: cfg.fonts.app_name.clone(),
            timeout: Duration::from_secs(cfg.bridge.call_timeout_seconds),
            refresh_wait: Duration::from_secs(cfg.fonts.refresh_wait_seconds),
        }
    }

    fn run(&self, what: &str, script: &crate::bridge::Script) -> bool {
        match self.bridge.execute(script, self.timeout) {
            Ok(_) => true,
            Err(e) => {
                warn!("{} {what} failed: {e}", self.app);
                false
            }
        }
    }
}

impl<B: Bridge> FontManager for ScriptedFontManager<'_, B> {
    fn is_running(&self) -> bool {
        match self
            .bridge
            .execute(&script::is_running(&self.app), self.timeout)
        {
            Ok(out) => out.is_true(),
            Err(e) => {
                warn!("{} running check failed: {e}", self.app);
                false
            }
        }
    }

    fn open_and_refresh(&self, load_time: Duration) -> bool {
        if !self.run("activate", &script::font_activate(&self.app)) {
            return false;
        }
        info!("waiting {:?} for {} to load", load_time, self.app);
        std::thread::sleep(load_time);
        self.refresh()
    }

    fn refresh(&self) -> bool {
        if !self.run("refresh", &script::font_refresh(&self.app)) {
            return false;
        }
        std::thread::sleep(self.refresh_wait);
        info!("{} refreshed", self.app);
        true
    }

    fn hide(&self) -> bool {
        self.run("hide", &script::font_hide(&self.app))
    }
}

/// Make sure fonts are synced before the batch starts. Failures are logged
/// and swallowed: missing fonts surface later as dialogs the batch handles.
pub fn prepare_fonts(cfg: &Config, fonts: &dyn FontManager) -> bool {
    if !cfg.fonts.enabled {
        return true;
    }
    let ok = if fonts.is_running() {
        fonts.refresh()
    } else {
        let ok = fonts.open_and_refresh(Duration::from_secs(cfg.fonts.load_time_seconds));
        if ok && cfg.fonts.hide_after_open {
            fonts.hide();
        }
        ok
    };
    if !ok {
        warn!("font refresh did not complete; continuing");
    }
    ok
}
