use itertools::Itertools;

use crate::completeness::Window;
use crate::error::SubsetSumError;
use crate::sumset::{SumsBitVector, TraceStep};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Everything known about one evaluated subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetReport {
    /// Absolute enumeration index (slice start already added).
    pub index: u64,
    pub elements: Vec<u32>,
    pub bits: SumsBitVector,
    pub low: u64,
    pub high: u64,
    pub passed: bool,
    /// Per-element accumulation steps, when tracing was requested.
    pub trace: Option<Vec<TraceStep>>,
}

impl SubsetReport {
    pub fn window(&self) -> Window {
        Window {
            low: self.low,
            high: self.high,
        }
    }
}

/// Receives reports from the sweep driver.
pub trait ReportSink {
    fn record(&mut self, report: &SubsetReport) -> Result<(), SubsetSumError>;
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn record(&mut self, _report: &SubsetReport) -> Result<(), SubsetSumError> {
        Ok(())
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub reports: Vec<SubsetReport>,
}

impl ReportSink for CollectingSink {
    fn record(&mut self, report: &SubsetReport) -> Result<(), SubsetSumError> {
        self.reports.push(report.clone());
        Ok(())
    }
}

// =============================================================================
// Text rendering
// =============================================================================

/// `[   1   2   6]`: every element right-aligned in four columns.
pub fn format_subset(elements: &[u32]) -> String {
    format!("[{}]", elements.iter().map(|e| format!("{e:4}")).join(""))
}

/// All bits, most significant first, one character per bit.
pub fn format_bits(bits: &SumsBitVector) -> String {
    bits.words().iter().map(|word| format!("{word:064b}")).join("")
}

/// Like [`format_bits`], with the sums of `window` in green and any missing
/// sum inside it in red.
pub fn format_bits_colored(bits: &SumsBitVector, window: Window) -> String {
    let len = bits.bit_len();
    let mut out = String::with_capacity(len as usize + 16);
    let mut inside = false;
    for position in 0..len {
        let value = len - position;
        let in_window = !window.is_empty() && (window.low..=window.high).contains(&value);
        if in_window && !inside {
            out.push_str(GREEN);
            inside = true;
        }
        let set = bits.contains_sum(value);
        match (set, in_window) {
            (true, _) => out.push('1'),
            (false, true) => {
                out.push_str(RED);
                out.push('0');
                out.push_str(GREEN);
            }
            (false, false) => out.push('0'),
        }
        if inside && value == window.low {
            out.push_str(RESET);
            inside = false;
        }
    }
    if inside {
        out.push_str(RESET);
    }
    out
}

/// One report line: index, subset, sums, window and verdict.
pub fn render_line(report: &SubsetReport, color: bool) -> String {
    let bits = if color {
        format_bits_colored(&report.bits, report.window())
    } else {
        format_bits(&report.bits)
    };
    format!(
        "{:15} {} = {}  match {:4} to {:4}  = {}",
        report.index,
        format_subset(&report.elements),
        bits,
        report.low,
        report.high,
        if report.passed { "pass" } else { "fail" }
    )
}

/// Three lines per element showing how the sums were built.
pub fn render_trace(steps: &[TraceStep]) -> Vec<String> {
    let mut lines = Vec::with_capacity(steps.len() * 3);
    for step in steps {
        lines.push(format!(
            "sums << {:<4}       = {}",
            step.element,
            format_bits(&step.shifted)
        ));
        lines.push(format!("sums |= shifted    = {}", format_bits(&step.combined)));
        lines.push(format!(
            "sums |= 1 << {:<4}  = {}",
            step.element.saturating_sub(1),
            format_bits(&step.seeded)
        ));
    }
    lines
}

// =============================================================================
// Number formatting
// =============================================================================

/// Group digits in threes: `1234567` becomes `1,234,567`.
pub fn format_int<T: Into<u128>>(value: T) -> String {
    let s = value.into().to_string();
    let len = s.len();
    if len <= 3 {
        return s;
    }
    let mut out = String::with_capacity(len + len / 3);
    for (count, ch) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

pub fn format_duration(seconds: f32) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "unknown".to_string();
    }
    let total = seconds.round() as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}
