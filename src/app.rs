//! Application Coordinator
//!
//! Wires the console surface to the dashboard orchestrator: an input thread
//! turns stdin lines into events, the orchestrator runs as a Tokio task, and a
//! renderer thread drains UI updates to stdout.

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::client::DetectionService;
use crate::config::AppConfig;
use crate::console::{parse_command, Command, ConsoleRenderer, HELP};
use crate::dashboard::DashboardOrchestrator;
use crate::shared::{DashboardEvent, SessionConfig, UiSink, UiUpdate};

/// Pending events before the input thread waits
const EVENT_BUFFER: usize = 64;

/// Main application coordinator
pub struct SafetyDashboardApp {
    /// Channel to send events to the orchestrator
    pub events: mpsc::Sender<DashboardEvent>,
    /// UI updates until the renderer takes them
    updates: Option<Receiver<UiUpdate>>,
    /// Orchestrator event loop
    event_loop: Option<tokio::task::JoinHandle<()>>,
    /// Handle to renderer thread
    renderer_handle: Option<JoinHandle<()>>,
    /// Tells the renderer to drain and exit
    renderer_stop: Option<Sender<()>>,
}

impl SafetyDashboardApp {
    /// Create the orchestrator and start its event loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        session: SessionConfig,
        config: &AppConfig,
        service: Arc<dyn DetectionService>,
    ) -> Self {
        let (sink, updates) = UiSink::channel();
        let (events, events_rx) = mpsc::channel(EVENT_BUFFER);

        let orchestrator = DashboardOrchestrator::new(session, config, service, sink);
        let event_loop = tokio::spawn(orchestrator.run(events_rx));
        info!("Dashboard event loop started");

        Self {
            events,
            updates: Some(updates),
            event_loop: Some(event_loop),
            renderer_handle: None,
            renderer_stop: None,
        }
    }

    /// Start printing UI updates in a background thread
    pub fn start_renderer(&mut self, save_dir: Option<PathBuf>) {
        let Some(updates) = self.updates.take() else {
            warn!("Renderer already running");
            return;
        };
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = std::thread::spawn(move || {
            let mut renderer = ConsoleRenderer::new(std::io::stdout(), save_dir);
            loop {
                crossbeam_channel::select! {
                    recv(updates) -> update => match update {
                        Ok(update) => {
                            render_logged(&mut renderer, &update);
                        }
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => {
                        for update in updates.try_iter() {
                            render_logged(&mut renderer, &update);
                        }
                        break;
                    }
                }
            }
        });

        self.renderer_handle = Some(handle);
        self.renderer_stop = Some(stop_tx);
    }

    /// Read commands from stdin in a background thread
    ///
    /// The thread is detached: it blocks on stdin and ends after `quit` or
    /// end of input.
    pub fn start_input(&self) {
        let events = self.events.clone();
        std::thread::spawn(move || {
            println!("{}", HELP);
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(Command::Event(event))) => {
                        if events.blocking_send(event).is_err() {
                            return;
                        }
                    }
                    Ok(Some(Command::Help)) => println!("{}", HELP),
                    Ok(Some(Command::Quit)) => break,
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            let _ = events.blocking_send(DashboardEvent::Shutdown);
        });
    }

    /// Wait for the orchestrator to shut down
    pub async fn wait(&mut self) -> Result<()> {
        if let Some(event_loop) = self.event_loop.take() {
            event_loop.await?;
        }
        Ok(())
    }
}

/// Render one update; write failures are logged and rendering continues
fn render_logged<W: Write>(renderer: &mut ConsoleRenderer<W>, update: &UiUpdate) -> bool {
    match renderer.render(update) {
        Ok(()) => true,
        Err(e) => {
            error!("Render error: {}", e);
            false
        }
    }
}

impl Drop for SafetyDashboardApp {
    fn drop(&mut self) {
        // Signal the orchestrator to stop
        let _ = self.events.try_send(DashboardEvent::Shutdown);

        // Let the renderer drain and wait for it
        if let Some(stop) = self.renderer_stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.renderer_handle.take() {
            let _ = handle.join();
        }
    }
}
