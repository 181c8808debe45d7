//! Operator-facing notification sink.
//!
//! Every classification decision produces exactly one line through a
//! `Notifier`. Messages are written as templates with positional
//! placeholders (`{0}`, `{1}`, ...) and rendered before they reach the sink.

use std::cell::RefCell;
use std::fmt;
use strum::Display;

/// Severity of a notification line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Substitute `{N}` placeholders with `args[N]`.
///
/// Placeholders without a matching argument, and braces that do not form
/// a placeholder, are copied through unchanged. Substituted text is never
/// rescanned.
pub fn render_template(template: &str, args: &[&dyn fmt::Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        let arg = if digits > 0 && after[digits..].starts_with('}') {
            after[..digits].parse::<usize>().ok().and_then(|i| args.get(i))
        } else {
            None
        };

        match arg {
            Some(arg) => {
                out.push_str(&arg.to_string());
                rest = &after[digits + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Logging collaborator with three severities.
pub trait Notifier {
    /// Deliver one rendered line
    fn notify(&self, severity: Severity, message: &str);

    fn info(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.notify(Severity::Info, &render_template(template, args));
    }

    fn warn(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.notify(Severity::Warn, &render_template(template, args));
    }

    fn error(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.notify(Severity::Error, &render_template(template, args));
    }
}

/// Forwards notifications to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "pdi_setup", "{}", message),
            Severity::Warn => tracing::warn!(target: "pdi_setup", "{}", message),
            Severity::Error => tracing::error!(target: "pdi_setup", "{}", message),
        }
    }
}

/// Keeps every line in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    lines: RefCell<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.borrow().clone()
    }

    pub fn severities(&self) -> Vec<Severity> {
        self.lines.borrow().iter().map(|(s, _)| *s).collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lines.borrow().iter().filter(|(s, _)| *s == severity).count()
    }

    /// True if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|(_, line)| line.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.lines.borrow_mut().push((severity, message.to_string()));
    }
}
