use std::io::Write;

use subsetsum_rs::error::SubsetSumError;
use subsetsum_rs::report::{ReportSink, SubsetReport, render_line, render_trace};

/// Writes one text line per report, preceded by the calculation steps when
/// the report carries them.
pub struct TextSink<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn flush(&mut self) -> Result<(), SubsetSumError> {
        self.out.flush().map_err(SubsetSumError::Report)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn record(&mut self, report: &SubsetReport) -> Result<(), SubsetSumError> {
        if let Some(steps) = &report.trace {
            writeln!(self.out).map_err(SubsetSumError::Report)?;
            for line in render_trace(steps) {
                writeln!(self.out, "{line}").map_err(SubsetSumError::Report)?;
            }
        }
        writeln!(self.out, "{}", render_line(report, self.color)).map_err(SubsetSumError::Report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subsetsum_rs::config::{Config, ReportMode};
    use subsetsum_rs::pipeline::SweepDriver;

    fn render_sweep(config: Config, color: bool) -> String {
        let driver = SweepDriver::new(config).expect("valid config");
        let mut sink = TextSink::new(Vec::new(), color);
        driver.run(&mut sink, None).expect("sweep");
        String::from_utf8(sink.into_inner()).expect("utf8")
    }

    #[test]
    fn writes_one_line_per_subset() {
        let mut config = Config::new(6, 3);
        config.report = ReportMode::All;
        let text = render_sweep(config, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines[0].starts_with("              0 [   1   2   6] = "));
        assert!(lines[9].ends_with("= fail"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn trace_lines_precede_the_report_line() {
        let mut config = Config::new(6, 3).with_slice(8, 1);
        config.report = ReportMode::Failures;
        config.trace = true;
        let text = render_sweep(config, true);
        let lines: Vec<&str> = text.lines().collect();
        // Blank separator, three lines per element, then the report.
        assert_eq!(lines.len(), 11);
        assert!(lines[0].is_empty());
        assert!(lines[1].starts_with("sums << 3"));
        assert!(lines[10].contains("[   3   5   6]"));
        assert!(lines[10].contains("\x1b[31m0"));
    }
}
