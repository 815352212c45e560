//! Terminal progress line for verbose copies.

use indicatif::DecimalBytes;
use std::io::{self, Write};

use crate::copy::Progress;

/// Columns kept free for the percentage and byte counts.
pub const RESERVED_COLUMNS: usize = 40;

/// Width assumed when the terminal cannot be queried.
pub const DEFAULT_WIDTH: usize = 80;

/// Render a progress bar for `percent` sized to a terminal `width` columns wide.
///
/// The bar itself gets `width - 40` columns; narrower terminals get an empty
/// bar rather than an error.
pub fn render_bar(percent: u64, width: usize) -> String {
    let percent = percent.min(100);
    let bar_width = width.saturating_sub(RESERVED_COLUMNS);
    let filled = percent as usize * bar_width / 100;

    let mut bar = String::with_capacity(bar_width + 8);
    bar.push('[');
    bar.extend(std::iter::repeat_n('=', filled));
    bar.push('>');
    bar.extend(std::iter::repeat_n(' ', bar_width - filled));
    bar.push_str(&format!("] {percent:>3}%"));
    bar
}

/// Current width of the terminal attached to stderr.
pub fn terminal_width() -> usize {
    console::Term::stderr()
        .size_checked()
        .map(|(_, cols)| cols as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Redraws a single progress line in place.
pub struct ProgressLine<W: Write> {
    out: W,
    width: Option<usize>,
}

impl ProgressLine<io::Stderr> {
    /// Progress line on stderr, resized to the terminal on every redraw.
    pub fn stderr() -> Self {
        Self {
            out: io::stderr(),
            width: None,
        }
    }
}

impl<W: Write> ProgressLine<W> {
    /// Progress line with a fixed width.
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: Some(width),
        }
    }

    pub fn render(&self, progress: &Progress) -> String {
        let width = self.width.unwrap_or_else(terminal_width);
        format!(
            "\r{} {:>10}/{:<10}",
            render_bar(progress.percent(), width),
            DecimalBytes(progress.transferred).to_string(),
            DecimalBytes(progress.target).to_string(),
        )
    }

    /// Overwrite the current line; the final report ends it with a newline.
    pub fn report(&mut self, progress: &Progress) -> io::Result<()> {
        let line = self.render(progress);
        self.out.write_all(line.as_bytes())?;
        if progress.finished {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
