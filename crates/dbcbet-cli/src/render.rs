//! Textual and JSON rendering of run invoices.

use std::fmt;

use clap::ValueEnum;

use dbcbet_check::Invoice;

/// Output format for `dbcbet run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// The log, one entry per line, followed by the summary counters.
pub struct TextReport<'a>(pub &'a Invoice);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let invoice = self.0;
        writeln!(f, "Bounded exhaustive test of {}", invoice.type_name)?;
        for entry in &invoice.log {
            writeln!(f, "{entry}")?;
        }
        let kinds = &invoice.failure_kinds;
        writeln!(f, "Summary:")?;
        writeln!(f, " Instance Candidates: {}", invoice.candidates)?;
        writeln!(f, " Invariant Violations: {}", invoice.invariant_violations)?;
        writeln!(f, " Method Call Candidates: {}", invoice.call_candidates)?;
        writeln!(f, " Precondition Violations: {}", invoice.precondition_violations)?;
        writeln!(f, " Failures: {}", invoice.failures)?;
        writeln!(f, " Successes: {}", invoice.successes)?;
        writeln!(
            f,
            " Failure Kinds: precondition {}, postcondition {}, invariant {}, throws {}",
            kinds.precondition, kinds.postcondition, kinds.invariant, kinds.throws
        )
    }
}

pub fn render_text(invoice: &Invoice) -> String {
    TextReport(invoice).to_string()
}

/// Pretty-printed JSON array of invoices.
pub fn render_json(invoices: &[Invoice]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(invoices)
}
