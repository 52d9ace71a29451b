use std::io::{Write, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::{debug, info};

use crate::app::{App, Message, Model, update};
use crate::fetch::FetchWorker;

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization or the event loop
    /// encounters an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; docshelf requires an interactive terminal")?;
        let size = terminal.size()?;

        let worker = self.worker();
        info!(site = %worker.describe(), "starting");
        let mut model = self.initial_model((size.width, size.height));

        let result = execute!(stdout(), EnableMouseCapture)
            .context("Failed to enable mouse capture")
            .and_then(|()| self.event_loop(&mut terminal, &mut model, &worker));

        let _ = set_mouse_motion_tracking(false);
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        worker: &FetchWorker,
    ) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;
        set_mouse_motion_tracking(true)?;

        loop {
            self.run_effects(model, worker);

            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                debug!(width, height, "applying resize");
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            while let Some(outcome) = worker.try_recv() {
                *model = update(std::mem::take(model), Message::FetchCompleted(outcome));
                self.run_effects(model, worker);
                needs_render = true;
            }

            // The idle poll also bounds how long a finished fetch waits to be shown.
            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() {
                10
            } else {
                50
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let msg =
                    Self::handle_event(event::read()?, model, event_ms, &mut resize_debouncer);
                if let Some(msg) = msg {
                    debug!(frame = frame_idx, ?msg, "message");
                    *model = update(std::mem::take(model), msg);
                    needs_render = true;
                }

                // Coalesce key repeat bursts into a single render.
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let msg =
                        Self::handle_event(event::read()?, model, drain_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        *model = update(std::mem::take(model), msg);
                        needs_render = true;
                    }
                }
            }

            if needs_render {
                frame_idx += 1;
                terminal.draw(|frame| Self::view(model, frame))?;
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }
}

fn set_mouse_motion_tracking(enable: bool) -> std::io::Result<()> {
    // Button-event tracking (1002) with SGR encoding (1006).
    let mut out = stdout();
    if enable {
        out.write_all(b"\x1b[?1002h\x1b[?1006h")?;
    } else {
        out.write_all(b"\x1b[?1002l\x1b[?1006l")?;
    }
    out.flush()
}
