use crate::parser::Diagnostic;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use tracing::{info, warn};

// ── Events from the update pipeline ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    SourceStarted { location: String },
    SourceParsed { location: String, records: usize },
    Diagnostic(Diagnostic),

    StoreStarted { total: usize },
    RecordStored { index: usize, total: usize, catalog_id: u32, name: String },
    StoreComplete { stored: usize },
}

/// Receives progress and diagnostics from the update pipeline.
pub trait EventSink {
    fn send(&self, event: UpdateEvent);
}

// ── Console sink ────────────────────────────────────────────────────────────

/// Logs events; shows a progress bar while records are written to the store.
pub struct ConsoleSink {
    verbose: bool,
    pb: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            pb: Mutex::new(None),
        }
    }

    fn make_pb(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

impl EventSink for ConsoleSink {
    fn send(&self, event: UpdateEvent) {
        match event {
            UpdateEvent::SourceStarted { location } => {
                info!("Loading TLEs from '{}'", location);
            }
            UpdateEvent::SourceParsed { location, records } => {
                info!("Parsed {} records from '{}'", records, location);
            }
            UpdateEvent::Diagnostic(diag) => warn!("{}", diag),

            UpdateEvent::StoreStarted { total } => {
                if let Ok(mut guard) = self.pb.lock() {
                    *guard = Some(Self::make_pb(total as u64));
                }
            }
            UpdateEvent::RecordStored { index, total, catalog_id, name } => {
                if let Ok(guard) = self.pb.lock() {
                    if let Some(pb) = guard.as_ref() {
                        pb.set_position(index as u64);
                        if self.verbose {
                            pb.println(format!(
                                "  Refreshing [{}/{}]: {} ({})",
                                index, total, catalog_id, name
                            ));
                        }
                    }
                }
            }
            UpdateEvent::StoreComplete { stored } => {
                if let Ok(mut guard) = self.pb.lock() {
                    if let Some(pb) = guard.take() {
                        pb.finish_and_clear();
                    }
                }
                info!("Stored {} records", stored);
            }
        }
    }
}

// ── Recording sink ──────────────────────────────────────────────────────────

/// Keeps every event, for inspection after a run.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UpdateEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UpdateEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UpdateEvent::Diagnostic(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn send(&self, event: UpdateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
