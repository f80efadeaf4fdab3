//! # Log Writer
//!
//! [`core::fmt::Write`] adapter that forwards rendered reports to the `log`
//! facade one line at a time. Lines are assembled in a fixed buffer;
//! overlong lines are cut, never split or dropped.

use core::fmt::{self, Write};

/// Default line buffer size
pub const LINE_MAX: usize = 256;

/// Fixed-size line assembler
#[derive(Debug, Default)]
pub struct LineBuffer<const N: usize> {
    line: heapless::String<N>,
    truncated: bool,
}

impl<const N: usize> LineBuffer<N> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            line: heapless::String::new(),
            truncated: false,
        }
    }

    /// Append text, handing every completed line to `emit`
    pub fn push_str(&mut self, s: &str, mut emit: impl FnMut(&str, bool)) {
        let mut parts = s.split('\n');
        if let Some(first) = parts.next() {
            self.append(first);
        }
        for part in parts {
            self.flush(&mut emit);
            self.append(part);
        }
    }

    /// Emit the pending partial line, if any
    pub fn flush(&mut self, mut emit: impl FnMut(&str, bool)) {
        emit(&self.line, self.truncated);
        self.line.clear();
        self.truncated = false;
    }

    /// Check if a partial line is pending
    pub fn is_empty(&self) -> bool {
        self.line.is_empty() && !self.truncated
    }

    fn append(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        if self.line.push_str(text).is_ok() {
            return;
        }
        for ch in text.chars() {
            if self.line.push(ch).is_err() {
                self.truncated = true;
                return;
            }
        }
    }
}

/// Writer emitting each line as a `log` record
#[derive(Debug)]
pub struct LogWriter<const N: usize = LINE_MAX> {
    level: log::Level,
    buffer: LineBuffer<N>,
}

impl<const N: usize> LogWriter<N> {
    /// Create a writer logging at `level`
    pub const fn new(level: log::Level) -> Self {
        Self {
            level,
            buffer: LineBuffer::new(),
        }
    }

    fn emit(level: log::Level) -> impl FnMut(&str, bool) {
        move |line, truncated| {
            if truncated {
                log::log!(level, "{}~", line);
            } else {
                log::log!(level, "{}", line);
            }
        }
    }
}

impl<const N: usize> Write for LogWriter<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s, Self::emit(self.level));
        Ok(())
    }
}

impl<const N: usize> Drop for LogWriter<N> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.flush(Self::emit(self.level));
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;

    use super::*;

    fn collect<const N: usize>(chunks: &[&str]) -> Vec<(String, bool)> {
        let mut lines = Vec::new();
        let mut buffer = LineBuffer::<N>::new();
        for chunk in chunks {
            buffer.push_str(chunk, |line, cut| lines.push((line.to_string(), cut)));
        }
        if !buffer.is_empty() {
            buffer.flush(|line, cut| lines.push((line.to_string(), cut)));
        }
        lines
    }

    #[test]
    fn test_lines_across_chunks() {
        let lines = collect::<64>(&["[  1.0", "00000] A\n[  2.", "000000] B\n"]);
        assert_eq!(
            lines,
            [
                ("[  1.000000] A".to_string(), false),
                ("[  2.000000] B".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_partial_line_pending() {
        let lines = collect::<64>(&["one\ntwo"]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].0, "two");
    }

    #[test]
    fn test_long_line_truncated() {
        let lines = collect::<8>(&["0123456789abcdef\nok\n"]);
        assert_eq!(lines[0], ("01234567".to_string(), true));
        assert_eq!(lines[1], ("ok".to_string(), false));
    }

    #[test]
    fn test_empty_lines_kept() {
        let lines = collect::<8>(&["\n\n"]);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|(l, _)| l.is_empty()));
    }

    #[test]
    fn test_log_writer_accepts_text() {
        let mut writer = LogWriter::<16>::new(log::Level::Info);
        assert!(writeln!(writer, "a line longer than sixteen bytes").is_ok());
    }
}
