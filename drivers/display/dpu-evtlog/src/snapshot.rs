//! # Commit Snapshots
//!
//! Window table snapshots captured for [`EventType::AtomicCommit`].
//!
//! A snapshot is a deep copy taken at claim time: it owns every value it
//! shows, so later changes to the live window configuration never reach
//! an already recorded commit.
//!
//! [`EventType::AtomicCommit`]: crate::EventType::AtomicCommit

use core::fmt;

use crate::source::CommitSource;
use crate::MAX_WIN_PER_DECON;

// =============================================================================
// WINDOW CONFIGURATION
// =============================================================================

/// Window state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WinState {
    /// Window not in use
    #[default]
    Disabled = 0,
    /// Window filled with a solid color
    Color    = 1,
    /// Window scanned out from a buffer
    Buffer   = 2,
}

impl WinState {
    /// Get name
    pub fn name(self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Color => "COLOR",
            Self::Buffer => "BUFFER",
        }
    }
}

/// Compression source of a window or DPP channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None = 0,
    /// AFBC compressed
    Afbc = 1,
    /// SBWC compressed
    Sbwc = 2,
}

impl Compression {
    /// Get name
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Afbc => "AFBC",
            Self::Sbwc => "SBWC",
        }
    }
}

/// Rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl Rect {
    /// Create a rectangle
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {} {}]", self.x, self.y, self.w, self.h)
    }
}

/// Per-window configuration as committed to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WinConfig {
    /// Window state
    pub state: WinState,
    /// Source crop
    pub src: Rect,
    /// Destination on screen
    pub dst: Rect,
    /// Pixel format identifier
    pub format: u32,
    /// DPP channel feeding the window (buffer-backed windows only)
    pub dpp_ch: u32,
    /// Compression source
    pub comp_src: Compression,
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// One window of a commit snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WinSnapshot {
    /// Copied window configuration
    pub win: WinConfig,
    /// DMA address of the scanned out buffer, `Buffer` windows only
    pub dma_addr: Option<u64>,
}

/// Window table captured at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitSnapshot {
    /// One entry per window slot
    pub windows: [WinSnapshot; MAX_WIN_PER_DECON],
}

impl CommitSnapshot {
    /// Deep copy the window table of a commit source
    ///
    /// Windows the source does not report are captured as disabled.
    pub fn capture(source: &dyn CommitSource) -> Self {
        let mut snapshot = Self::default();

        for (index, slot) in snapshot.windows.iter_mut().enumerate() {
            let Some(win) = source.window(index) else {
                continue;
            };

            slot.win = win;
            if win.state == WinState::Buffer {
                slot.dma_addr = Some(source.dma_addr(win.dpp_ch).unwrap_or(0));
            }
        }

        snapshot
    }

    /// Iterate over non-disabled windows with their index
    pub fn active(&self) -> impl Iterator<Item = (usize, &WinSnapshot)> {
        self.windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.win.state != WinState::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table {
        windows: [Option<WinConfig>; 3],
        dma: u64,
    }

    impl CommitSource for Table {
        fn window(&self, index: usize) -> Option<WinConfig> {
            self.windows.get(index).copied().flatten()
        }

        fn dma_addr(&self, dpp_ch: u32) -> Option<u64> {
            Some(self.dma + u64::from(dpp_ch))
        }
    }

    fn buffer_win(dpp_ch: u32) -> WinConfig {
        WinConfig {
            state: WinState::Buffer,
            src: Rect::new(0, 0, 1080, 2400),
            dst: Rect::new(0, 0, 1080, 2400),
            format: 0x34325241,
            dpp_ch,
            comp_src: Compression::Afbc,
        }
    }

    #[test]
    fn test_capture_copies_windows() {
        let color = WinConfig {
            state: WinState::Color,
            dst: Rect::new(0, 0, 100, 100),
            ..WinConfig::default()
        };
        let table = Table {
            windows: [Some(buffer_win(2)), None, Some(color)],
            dma: 0x8000_0000,
        };

        let snapshot = CommitSnapshot::capture(&table);

        assert_eq!(snapshot.windows[0].win, buffer_win(2));
        assert_eq!(snapshot.windows[0].dma_addr, Some(0x8000_0002));
        assert_eq!(snapshot.windows[1].win.state, WinState::Disabled);
        assert_eq!(snapshot.windows[2].dma_addr, None);

        let active: alloc::vec::Vec<usize> = snapshot.active().map(|(i, _)| i).collect();
        assert_eq!(active, [0, 2]);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut table = Table {
            windows: [Some(buffer_win(1)), None, None],
            dma: 0x1000,
        };
        let snapshot = CommitSnapshot::capture(&table);

        table.windows[0] = Some(WinConfig::default());
        table.dma = 0;

        assert_eq!(snapshot.windows[0].win, buffer_win(1));
        assert_eq!(snapshot.windows[0].dma_addr, Some(0x1001));
    }
}
