//! Monitoring module for the SSH alert pipeline
//!
//! This module provides the event-extraction and delivery infrastructure:
//! - Log file following
//! - Rule-based line classification
//! - Notification formatting
//! - Telegram delivery
//! - The pipeline driver loop

pub mod classifier;
pub mod formatter;
pub mod log_watcher;
pub mod processor;
pub mod rules;
pub mod telegram_alert;

pub use classifier::{normalize_whitespace, Classifier, LineClassifier};
pub use formatter::format_event;
pub use log_watcher::{tail_available, LineSource, TailFollower};
pub use processor::{EventProcessor, LineOutcome, PipelineStats};
pub use rules::{PatternRule, RuleSet};
pub use telegram_alert::{AlertSender, TelegramAlert};
