use anyhow::{Context, Result};
use opencv::{core::Mat, highgui};

use crate::{config::DisplayConfig, traits::DisplaySink};

/// An on-screen HighGUI window. Its key poll doubles as the window's event
/// pump, so it has to run once per shown frame.
pub struct WindowDisplay {
    title: String,
    quit_key: char,
    poll_ms: i32,
    open: bool,
}

impl WindowDisplay {
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        highgui::named_window(&config.window_title, highgui::WINDOW_AUTOSIZE)
            .context("Failed to open display window")?;

        Ok(WindowDisplay {
            title: config.window_title.clone(),
            quit_key: config.quit_key,
            poll_ms: config.poll_ms.max(1),
            open: true,
        })
    }
}

impl DisplaySink for WindowDisplay {
    fn show(&mut self, frame: &Mat) -> Result<()> {
        highgui::imshow(&self.title, frame)?;
        Ok(())
    }

    fn poll_quit(&mut self) -> Result<bool> {
        let key = highgui::wait_key(self.poll_ms)?;
        Ok(is_quit_key(key, self.quit_key))
    }

    fn release(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            highgui::destroy_all_windows().context("Failed to close display window")?;
        }
        Ok(())
    }
}

/// Drops frames on the floor; for runs without a screen.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    pub frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        HeadlessDisplay::default()
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, _frame: &Mat) -> Result<()> {
        self.frames_shown += 1;
        Ok(())
    }

    fn poll_quit(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn open_display(config: &DisplayConfig) -> Result<Box<dyn DisplaySink>> {
    if config.headless {
        Ok(Box::new(HeadlessDisplay::new()))
    } else {
        Ok(Box::new(WindowDisplay::new(config)?))
    }
}

/// `wait_key` reports -1 when nothing was pressed and may set modifier bits
/// above the low byte.
fn is_quit_key(key: i32, quit_key: char) -> bool {
    key >= 0 && (key & 0xFF) as u32 == quit_key as u32
}
