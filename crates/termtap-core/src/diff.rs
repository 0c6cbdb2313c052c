//! Output delta between two full-buffer snapshots.
//!
//! The terminal owns a single scrollback buffer that other actors mutate
//! concurrently, so the only reliable evidence of "new output" is a pair of
//! snapshots. [`classify`] decides which of the known shapes the change has,
//! in a fixed precedence order, and [`extract_new_output`] renders that shape
//! as the text the caller has not seen yet.

/// How `after` relates to `before`.
///
/// Variants are listed in the order they are tested. Borrowed slices point
/// into `after`; nothing is copied until [`DiffOutcome::into_delta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome<'a> {
    /// Nothing was read before; the whole buffer is new.
    Initial(&'a str),
    /// Buffers are identical.
    Unchanged,
    /// The buffer got shorter (clear, reset). Reported as no output rather
    /// than guessing what survived.
    Shrunk,
    /// `after` is `before` plus a suffix.
    Append(&'a str),
    /// Every line of `before` is intact and `after` carries extra lines.
    ExtraLines(Vec<&'a str>),
    /// The first differing line grew in place; `rest` are the lines after it.
    LineExtended { suffix: &'a str, rest: Vec<&'a str> },
    /// The buffer was redrawn from line `from` on; everything from there is
    /// returned, over-reporting rather than dropping output.
    Rewrite { from: usize, lines: Vec<&'a str> },
}

impl DiffOutcome<'_> {
    pub fn into_delta(self) -> String {
        match self {
            DiffOutcome::Initial(all) => all.to_string(),
            DiffOutcome::Unchanged | DiffOutcome::Shrunk => String::new(),
            DiffOutcome::Append(suffix) => suffix.to_string(),
            DiffOutcome::ExtraLines(lines) => lines.join("\n"),
            DiffOutcome::LineExtended { suffix, rest } => {
                let mut parts = Vec::with_capacity(rest.len() + 1);
                parts.push(suffix);
                parts.extend(rest);
                parts.join("\n")
            }
            DiffOutcome::Rewrite { lines, .. } => lines.join("\n"),
        }
    }
}

pub fn classify<'a>(before: &str, after: &'a str) -> DiffOutcome<'a> {
    if before.is_empty() {
        return DiffOutcome::Initial(after);
    }
    if before == after {
        return DiffOutcome::Unchanged;
    }
    if after.len() < before.len() {
        return DiffOutcome::Shrunk;
    }
    if let Some(suffix) = after.strip_prefix(before) {
        return DiffOutcome::Append(suffix);
    }

    let before_lines: Vec<&str> = before.split('\n').collect();
    let after_lines: Vec<&'a str> = after.split('\n').collect();

    let divergence = before_lines
        .iter()
        .zip(after_lines.iter())
        .position(|(b, a)| b != a);

    match divergence {
        None if after_lines.len() > before_lines.len() => {
            DiffOutcome::ExtraLines(after_lines[before_lines.len()..].to_vec())
        }
        None => DiffOutcome::Unchanged,
        Some(i) => match after_lines[i].strip_prefix(before_lines[i]) {
            Some(suffix) => DiffOutcome::LineExtended {
                suffix,
                rest: after_lines[i + 1..].to_vec(),
            },
            None => DiffOutcome::Rewrite {
                from: i,
                lines: after_lines[i..].to_vec(),
            },
        },
    }
}

/// Text present in `after` that was not yet visible in `before`.
pub fn extract_new_output(before: &str, after: &str) -> String {
    classify(before, after).into_delta()
}
