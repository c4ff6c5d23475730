// Path: crates/types/src/window.rs
//! The historical block range an aggregation observes.

use crate::error::AggregationError;
use serde::{Deserialize, Serialize};

/// A historical block range `[start_block, end_block]` with `start_block < end_block`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct BlockWindow {
    /// The first observed block.
    pub start_block: u64,
    /// The last observed block.
    pub end_block: u64,
}

impl BlockWindow {
    /// Creates a window, rejecting empty or inverted ranges.
    pub fn new(start_block: u64, end_block: u64) -> Result<Self, AggregationError> {
        let window = Self {
            start_block,
            end_block,
        };
        window.validate()?;
        Ok(window)
    }

    /// Checks the `start_block < end_block` invariant.
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.start_block >= self.end_block {
            return Err(AggregationError::InvalidWindow {
                start: self.start_block,
                end: self.end_block,
            });
        }
        Ok(())
    }

    /// The block at which eligibility derived from this window is anchored.
    pub fn anchor_block(&self) -> u64 {
        self.end_block.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rejects_empty_and_inverted() {
        assert!(BlockWindow::new(100, 200).is_ok());
        assert_eq!(
            BlockWindow::new(200, 200),
            Err(AggregationError::InvalidWindow {
                start: 200,
                end: 200
            })
        );
        assert!(BlockWindow::new(201, 200).is_err());
    }

    #[test]
    fn test_anchor_is_one_past_end() {
        let w = BlockWindow::new(100, 200).unwrap();
        assert_eq!(w.anchor_block(), 201);
    }
}
