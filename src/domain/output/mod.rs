//! Generic handling of captured tool output
//!
//! Every adapter classifies lines its own way, but decoding, carriage-return
//! handling, repeat collapsing and the success rule are shared here so one
//! failure policy applies to every tool.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::domain::errors::ConverterError;
use crate::domain::model::{LineClass, ProcessOutput};

/// Which captured streams an adapter's classifier should see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSelection {
    Stdout,
    Stderr,
    Both,
}

/// Text encoding of a tool's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Tools that emit raw control bytes
    Latin1,
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// A line together with how many identical lines directly followed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collapsed<'a> {
    pub line: &'a str,
    pub repeats: usize,
}

/// Iterator collapsing runs of identical consecutive lines
pub struct CollapseRepeats<'a, I: Iterator<Item = &'a str>> {
    inner: std::iter::Peekable<I>,
}

impl<'a, I: Iterator<Item = &'a str>> Iterator for CollapseRepeats<'a, I> {
    type Item = Collapsed<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.inner.next()?;
        let mut repeats = 0;
        while self.inner.next_if(|next| *next == line).is_some() {
            repeats += 1;
        }
        Some(Collapsed { line, repeats })
    }
}

/// Collapse repeated consecutive lines into one with a count
pub fn collapse_repeats<'a, I>(lines: I) -> CollapseRepeats<'a, I::IntoIter>
where
    I: IntoIterator<Item = &'a str>,
{
    CollapseRepeats {
        inner: lines.into_iter().peekable(),
    }
}

/// Split captured text into display lines
///
/// Progress meters redraw with `\r`; only the text after the last carriage
/// return of each physical line is kept. Blank lines are dropped.
pub fn display_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| {
            let line = line.trim_end_matches('\r');
            line.rsplit('\r').next().unwrap_or(line).trim_end()
        })
        .filter(|line| !line.is_empty())
}

/// One classified line kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub class: LineClass,
    pub line: String,
    pub repeats: usize,
}

/// Outcome of classifying a finished invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputReport {
    pub success: bool,
    /// Line that aborted the invocation, or the raised message
    pub fatal: Option<String>,
    pub warnings: Vec<String>,
    pub last_progress: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify captured output and derive success
///
/// A classifier returning `Fatal` and a classifier raising an error are
/// treated the same: classification stops and the triggering text becomes
/// the failure reason. Success additionally requires exit code zero.
pub fn parse_output<F>(
    output: &ProcessOutput,
    streams: StreamSelection,
    encoding: TextEncoding,
    classify: F,
) -> OutputReport
where
    F: Fn(&str) -> Result<LineClass, ConverterError>,
{
    let mut report = OutputReport::default();
    let mut texts = Vec::with_capacity(2);
    if matches!(streams, StreamSelection::Stderr | StreamSelection::Both) {
        texts.push(encoding.decode(&output.stderr));
    }
    if matches!(streams, StreamSelection::Stdout | StreamSelection::Both) {
        texts.push(encoding.decode(&output.stdout));
    }

    'streams: for text in &texts {
        for Collapsed { line, repeats } in collapse_repeats(display_lines(text)) {
            let class = match classify(line) {
                Ok(class) => class,
                Err(raised) => {
                    report.fatal = Some(raised.to_string());
                    break 'streams;
                }
            };
            match class {
                LineClass::Fatal => {
                    report.fatal = Some(line.to_string());
                    break 'streams;
                }
                LineClass::Warning => {
                    warn!("{}", line);
                    if repeats > 0 {
                        warn!("(Last message repeats {} more times)", repeats);
                    }
                    report.warnings.push(line.to_string());
                }
                LineClass::Progress => {
                    debug!("{}", line);
                    report.last_progress = Some(line.to_string());
                }
                LineClass::Noise => {
                    trace!("{}", line);
                    continue;
                }
            }
            report.diagnostics.push(Diagnostic {
                class,
                line: line.to_string(),
                repeats,
            });
        }
    }

    if let Some(fatal) = &report.fatal {
        report.diagnostics.push(Diagnostic {
            class: LineClass::Fatal,
            line: fatal.clone(),
            repeats: 0,
        });
    }
    report.success = output.exit_code == Some(0) && report.fatal.is_none();
    report
}
