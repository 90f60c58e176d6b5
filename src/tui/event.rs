use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvError};
use crossterm::event::{self, KeyEvent, KeyEventKind};

use crate::error::FlowdeckError;

/// Events consumed by the console event loop.
#[derive(Debug)]
pub enum Event {
    /// A key press from crossterm (release events are filtered out at the
    /// source).
    Key(KeyEvent),
    /// Terminal window was resized to (columns, rows).
    Resize(u16, u16),
    /// Frame tick: time to check for a newer published state.
    Tick,
}

/// Background input pump.
///
/// One thread multiplexes crossterm input and the frame clock onto a single
/// bounded channel, so the main thread consumes keys, resizes, and ticks in
/// one ordered stream and rendering never interleaves with itself. Ticks
/// are scheduled against an absolute deadline, so a burst of input does not
/// delay the next frame.
pub struct EventHandler {
    rx: Receiver<Event>,
    _handle: thread::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(frame_interval: Duration) -> Result<Self, FlowdeckError> {
        let (tx, rx) = bounded(32);

        let handle = thread::Builder::new()
            .name("flowdeck-input".into())
            .spawn(move || {
                let mut next_tick = Instant::now() + frame_interval;
                loop {
                    let timeout = next_tick.saturating_duration_since(Instant::now());
                    match event::poll(timeout) {
                        Ok(true) => match event::read() {
                            Ok(event::Event::Key(key)) if key.kind != KeyEventKind::Release => {
                                if tx.send(Event::Key(key)).is_err() {
                                    return;
                                }
                            }
                            Ok(event::Event::Resize(w, h)) => {
                                if tx.send(Event::Resize(w, h)).is_err() {
                                    return;
                                }
                            }
                            // Key releases, mouse, focus, and paste events
                            Ok(_) => {}
                            Err(_) => return,
                        },
                        Ok(false) => {}
                        Err(_) => return,
                    }

                    if Instant::now() >= next_tick {
                        if tx.send(Event::Tick).is_err() {
                            return;
                        }
                        next_tick += frame_interval;
                    }
                }
            })
            .map_err(|e| FlowdeckError::Fatal(format!("spawn input thread: {e}")))?;

        Ok(Self {
            rx,
            _handle: handle,
        })
    }

    /// Blocks until the next event is available.
    pub fn next(&self) -> Result<Event, RecvError> {
        self.rx.recv()
    }
}
