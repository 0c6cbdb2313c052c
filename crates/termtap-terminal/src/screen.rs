use std::sync::Mutex;

use vt100::Parser;

use termtap_common::mutex_lock_or_recover;

pub const DEFAULT_SCROLLBACK: usize = 1000;

/// Emulated screen fed with raw PTY output.
///
/// Text is rendered one terminal row per line, right-trimmed, with blank
/// rows at the bottom dropped, so a buffer that only gained output reads as
/// the old text plus a suffix.
pub struct VirtualTerminal {
    parser: Mutex<Parser>,
    cols: u16,
    rows: u16,
}

impl VirtualTerminal {
    pub fn with_scrollback(cols: u16, rows: u16, scrollback: usize) -> Self {
        Self {
            parser: Mutex::new(Parser::new(rows, cols, scrollback)),
            cols,
            rows,
        }
    }

    pub fn process(&self, data: &[u8]) {
        let mut parser = mutex_lock_or_recover(&self.parser);
        parser.process(data);
    }

    /// Scrollback followed by the visible rows.
    pub fn buffer_text(&self) -> String {
        let mut parser = mutex_lock_or_recover(&self.parser);

        parser.screen_mut().set_scrollback(usize::MAX);
        let mut offset = parser.screen().scrollback();
        let mut lines: Vec<String> = Vec::with_capacity(offset + self.rows as usize);

        // A view scrolled back by `offset` starts at the oldest retained
        // row, so page down one screenful at a time.
        while offset > 0 {
            parser.screen_mut().set_scrollback(offset);
            let take = offset.min(self.rows as usize);
            lines.extend(parser.screen().rows(0, self.cols).take(take));
            offset -= take;
        }

        parser.screen_mut().set_scrollback(0);
        lines.extend(parser.screen().rows(0, self.cols));
        render(lines)
    }
}

fn render(rows: Vec<String>) -> String {
    let mut lines: Vec<String> = rows
        .into_iter()
        .map(|row| row.trim_end().to_string())
        .collect();

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}
