//! Pipeline end-to-end tests
//!
//! Drive the real classifier and formatter with a scripted line source and a
//! recording sender.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ssh_alert::event::EventKind;
use ssh_alert::monitoring::{
    AlertSender, Classifier, EventProcessor, LineOutcome, LineSource, RuleSet,
};
use ssh_alert::AppError;

const ACCEPTED: &str =
    "Jan 10 03:14:07 host1 sshd[1234]: Accepted publickey for alice from 10.0.0.5 port 52344";
const FAILED: &str = "Jan 10 03:15:00 host1 sshd[1234]: Failed password for invalid user root from 203.0.113.9 port 41000";
const GARBAGE: &str = "garbage unrelated text";

/// Source that yields fixed lines, then ends
struct ScriptedSource {
    lines: VecDeque<String>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(lines: &[&str]) -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                closed: closed.clone(),
            },
            closed,
        )
    }
}

#[async_trait]
impl LineSource for ScriptedSource {
    async fn next_line(&mut self) -> Result<Option<String>, AppError> {
        Ok(self.lines.pop_front())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Sender that records every attempt and fails the first `failures` of them
#[derive(Clone)]
struct RecordingSender {
    attempts: Arc<Mutex<Vec<String>>>,
    failures: Arc<AtomicUsize>,
}

impl RecordingSender {
    fn new(failures: usize) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(AtomicUsize::new(failures)),
        }
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AlertSender for RecordingSender {
    async fn send(&self, text: &str) -> Result<(), AppError> {
        self.attempts.lock().expect("lock").push(text.to_string());

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::DeliveryRejected {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }
        Ok(())
    }
}

fn classifier() -> Classifier {
    Classifier::new(RuleSet::Syslog).expect("rules should compile")
}

#[test]
fn should_classify_documented_examples() {
    // Arrange
    let classifier = classifier();

    // Act
    let accepted = classifier.classify(ACCEPTED).expect("accepted should match");
    let failed = classifier.classify(FAILED).expect("failed should match");
    let garbage = classifier.classify(GARBAGE);

    // Assert
    assert_eq!(accepted.kind, EventKind::Accepted);
    assert_eq!(accepted.username.as_deref(), Some("alice"));
    assert_eq!(accepted.client_ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(accepted.port, Some(52344));
    assert_eq!(accepted.auth_method.as_deref(), Some("publickey"));

    assert_eq!(failed.kind, EventKind::Failed);
    assert_eq!(failed.username.as_deref(), Some("root"));
    assert_eq!(failed.client_ip.as_deref(), Some("203.0.113.9"));
    assert_eq!(failed.port, Some(41000));
    assert_eq!(failed.auth_method.as_deref(), Some("password"));

    assert!(garbage.is_none());
}

#[tokio::test]
async fn should_deliver_in_order_and_skip_unmatched_lines() {
    // Arrange
    let (source, closed) = ScriptedSource::new(&[ACCEPTED, GARBAGE, FAILED]);
    let sender = RecordingSender::new(0);
    let mut processor = EventProcessor::new(source, classifier(), sender.clone());

    // Act
    let result = processor.run(std::future::pending()).await;

    // Assert
    assert!(matches!(result, Err(AppError::SourceTerminated)));
    assert!(closed.load(Ordering::SeqCst));

    let attempts = sender.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].contains("🔑 Status: Accepted"));
    assert!(attempts[0].contains(ACCEPTED));
    assert!(attempts[1].contains("🔑 Status: Failed"));
    assert!(attempts[1].contains("🔒 Method: password"));

    let stats = processor.stats();
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.unmatched, 1);
    assert_eq!(stats.delivered, 2);
}

#[tokio::test]
async fn should_keep_processing_after_delivery_failure() {
    // Arrange
    let (source, _) = ScriptedSource::new(&[ACCEPTED, FAILED]);
    let sender = RecordingSender::new(1);
    let mut processor = EventProcessor::new(source, classifier(), sender.clone());

    // Act
    let result = processor.run(std::future::pending()).await;

    // Assert
    assert!(matches!(result, Err(AppError::SourceTerminated)));
    assert_eq!(sender.attempts().len(), 2);
    let stats = processor.stats();
    assert_eq!(stats.delivery_failed, 1);
    assert_eq!(stats.delivered, 1);
}

#[tokio::test]
async fn should_return_outcome_per_line() {
    // Arrange
    let (source, _) = ScriptedSource::new(&[]);
    let sender = RecordingSender::new(1);
    let mut processor = EventProcessor::new(source, classifier(), sender.clone());

    // Act
    let failed_delivery = processor.process_line(ACCEPTED).await;
    let unmatched = processor.process_line(GARBAGE).await;
    let delivered = processor.process_line(FAILED).await;

    // Assert
    assert_eq!(failed_delivery, LineOutcome::DeliveryFailed);
    assert_eq!(unmatched, LineOutcome::Unmatched);
    assert_eq!(delivered, LineOutcome::Delivered);
}
