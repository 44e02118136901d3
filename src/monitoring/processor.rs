//! Pipeline driver for SSH event notifications
//!
//! Pulls lines from a [`LineSource`], classifies them, and delivers one
//! notification per matched event:
//! - unmatched lines -> warning, next line
//! - delivery failure -> error, next line
//! - classify/format panic -> error, next line
//! - source ended -> loop stops with `SourceTerminated`

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, instrument, warn};

use crate::monitoring::classifier::{Classifier, LineClassifier};
use crate::monitoring::formatter::format_event;
use crate::monitoring::log_watcher::LineSource;
use crate::monitoring::telegram_alert::AlertSender;
use crate::utils::AppError;

/// Result of processing a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line, ignored
    Skipped,
    /// No rule matched
    Unmatched,
    /// Matched and the notification was accepted
    Delivered,
    /// Matched but delivery failed
    DeliveryFailed,
    /// Classification or formatting panicked
    Faulted,
}

/// Counters reported when the pipeline stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub lines: u64,
    pub unmatched: u64,
    pub delivered: u64,
    pub delivery_failed: u64,
    pub faulted: u64,
}

impl PipelineStats {
    fn record(&mut self, outcome: LineOutcome) {
        match outcome {
            LineOutcome::Skipped => return,
            LineOutcome::Unmatched => self.unmatched += 1,
            LineOutcome::Delivered => self.delivered += 1,
            LineOutcome::DeliveryFailed => self.delivery_failed += 1,
            LineOutcome::Faulted => self.faulted += 1,
        }
        self.lines += 1;
    }
}

/// Sequential line -> event -> notification loop
pub struct EventProcessor<S, A, C = Classifier>
where
    S: LineSource,
    A: AlertSender,
    C: LineClassifier,
{
    /// Line source, closed when the loop exits
    source: S,
    /// Rule classifier
    classifier: C,
    /// Notification delivery
    sender: A,
    stats: PipelineStats,
}

impl<S, A, C> EventProcessor<S, A, C>
where
    S: LineSource,
    A: AlertSender,
    C: LineClassifier,
{
    /// Create a new pipeline driver
    pub fn new(source: S, classifier: C, sender: A) -> Self {
        Self {
            source,
            classifier,
            sender,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Classify one line and, on a match, deliver its notification.
    ///
    /// Never fails: every problem is logged and turned into an outcome.
    pub async fn process_line(&mut self, raw: &str) -> LineOutcome {
        let outcome = self.handle_line(raw).await;
        self.stats.record(outcome);
        outcome
    }

    async fn handle_line(&self, raw: &str) -> LineOutcome {
        if raw.trim().is_empty() {
            return LineOutcome::Skipped;
        }

        let classified = panic::catch_unwind(AssertUnwindSafe(|| {
            self.classifier
                .classify(raw)
                .map(|event| {
                    let text = format_event(&event);
                    (event, text)
                })
        }));

        let (event, text) = match classified {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                warn!(line = %raw, "Line did not match any rule");
                return LineOutcome::Unmatched;
            }
            Err(payload) => {
                let fault = AppError::classification_fault(panic_message(payload.as_ref()));
                error!(error = %fault, line = %raw, "Skipping line");
                return LineOutcome::Faulted;
            }
        };

        let server = event.server_name.as_deref().unwrap_or("N/A");
        let user = event.username.as_deref().unwrap_or("N/A");
        let client_ip = event.client_ip.as_deref().unwrap_or("N/A");

        info!(
            status = %event.kind,
            server = %server,
            user = %user,
            client_ip = %client_ip,
            "Event matched"
        );

        match self.sender.send(&text).await {
            Ok(()) => {
                info!(
                    status = %event.kind,
                    server = %server,
                    user = %user,
                    client_ip = %client_ip,
                    "Notification sent"
                );
                LineOutcome::Delivered
            }
            Err(e) => {
                error!(
                    error = %e,
                    status = %event.kind,
                    server = %server,
                    user = %user,
                    client_ip = %client_ip,
                    "Notification delivery failed"
                );
                LineOutcome::DeliveryFailed
            }
        }
    }

    /// Run until `shutdown` resolves or the source ends.
    ///
    /// The source is closed on every exit path. Returns the final counters on
    /// shutdown, `SourceTerminated` if the source ran dry, or the source's
    /// read error.
    #[instrument(skip_all, level = "info")]
    pub async fn run<F>(&mut self, shutdown: F) -> Result<PipelineStats, AppError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Starting event pipeline");

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(()),
                next = self.source.next_line() => next,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => {
                    error!("Line source terminated unexpectedly");
                    break Err(AppError::SourceTerminated);
                }
                Err(e) => {
                    error!(error = %e, "Line source failed");
                    break Err(e);
                }
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested while processing a line, abandoning it");
                    break Ok(());
                }
                outcome = self.process_line(&line) => {
                    debug!(outcome = ?outcome, "Line processed");
                }
            }
        };

        self.source.close().await;

        let stats = self.stats;
        info!(
            lines = stats.lines,
            unmatched = stats.unmatched,
            delivered = stats.delivered,
            delivery_failed = stats.delivery_failed,
            faulted = stats.faulted,
            "Event pipeline stopped"
        );

        result.map(|()| stats)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
