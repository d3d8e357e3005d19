// Score grid: 12 rows (targets 1-12) of 7 boxes each.
//
// Rows are stored as 7-bit masks so a Grid stays a flat Vec<u8> on the wire
// and every row is guaranteed to have exactly seven boxes.

use spacetimedb::SpacetimeType;

/// Number of rows on a grid (one per target 1..=12)
pub const ROWS: u8 = 12;

/// Boxes a row needs before it counts as complete
pub const BOXES_PER_ROW: u8 = 7;

const FULL_ROW: u8 = (1 << BOXES_PER_ROW) - 1;

/// Combinations of two dice that sum to `sum` (out of 36)
fn two_dice_ways(sum: u8) -> u8 {
    match sum {
        2 | 12 => 1,
        3 | 11 => 2,
        4 | 10 => 3,
        5 | 9 => 4,
        6 | 8 => 5,
        7 => 6,
        _ => 1,
    }
}

/// Inverse-probability weight of a row, used only for progress display.
/// Rows 1-6 are single-die targets (p = 1/6); rows 7-12 need a two-dice sum.
pub fn row_weight(row: u8) -> f64 {
    if (1..=6).contains(&row) {
        6.0
    } else {
        36.0 / two_dice_ways(row) as f64
    }
}

/// One player's progress board
#[derive(SpacetimeType, Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Bitmask per row, index 0 = row 1. Bit i = box i checked.
    pub rows: Vec<u8>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    pub fn empty() -> Self {
        Grid { rows: vec![0; ROWS as usize] }
    }

    fn index(row: u8) -> Option<usize> {
        (1..=ROWS).contains(&row).then(|| (row - 1) as usize)
    }

    fn mask(&self, row: u8) -> u8 {
        Self::index(row)
            .and_then(|i| self.rows.get(i).copied())
            .unwrap_or(0)
            & FULL_ROW
    }

    fn set_mask(&mut self, row: u8, mask: u8) {
        if let Some(i) = Self::index(row) {
            // Rows written by older clients may be short
            if self.rows.len() < ROWS as usize {
                self.rows.resize(ROWS as usize, 0);
            }
            self.rows[i] = mask & FULL_ROW;
        }
    }

    /// The seven boxes of `row`, left to right
    #[cfg(test)]
    pub fn boxes(&self, row: u8) -> [bool; BOXES_PER_ROW as usize] {
        let mask = self.mask(row);
        std::array::from_fn(|i| mask & (1 << i) != 0)
    }

    #[cfg(test)]
    pub fn is_checked(&self, row: u8, index: u8) -> bool {
        index < BOXES_PER_ROW && self.mask(row) & (1 << index) != 0
    }

    #[cfg(test)]
    pub fn set_box(&mut self, row: u8, index: u8, checked: bool) {
        if index >= BOXES_PER_ROW {
            return;
        }
        let mask = self.mask(row);
        let next = if checked { mask | (1 << index) } else { mask & !(1 << index) };
        self.set_mask(row, next);
    }

    #[cfg(test)]
    pub fn toggle_box(&mut self, row: u8, index: u8) {
        let checked = self.is_checked(row, index);
        self.set_box(row, index, !checked);
    }

    /// Checked boxes in `row`
    pub fn filled(&self, row: u8) -> u8 {
        self.mask(row).count_ones() as u8
    }

    pub fn is_row_complete(&self, row: u8) -> bool {
        self.mask(row) == FULL_ROW
    }

    /// Won when every row is complete
    pub fn is_won(&self) -> bool {
        (1..=ROWS).all(|row| self.is_row_complete(row))
    }

    /// Check up to `count` empty boxes in `row`, leftmost first.
    /// Returns how many boxes were actually checked (capped at the row size).
    pub fn fill(&mut self, row: u8, count: u8) -> u8 {
        if Self::index(row).is_none() {
            return 0;
        }
        let mut mask = self.mask(row);
        let mut added = 0;
        for i in 0..BOXES_PER_ROW {
            if added == count {
                break;
            }
            if mask & (1 << i) == 0 {
                mask |= 1 << i;
                added += 1;
            }
        }
        self.set_mask(row, mask);
        added
    }

    pub fn checked_boxes(&self) -> u32 {
        (1..=ROWS).map(|row| self.filled(row) as u32).sum()
    }

    pub fn completed_rows(&self) -> u8 {
        (1..=ROWS).filter(|&row| self.is_row_complete(row)).count() as u8
    }

    /// Weighted completion in [0, 1]; harder rows count for more
    pub fn weighted_progress(&self) -> f64 {
        let (done, total) = (1..=ROWS).fold((0.0, 0.0), |(done, total), row| {
            let w = row_weight(row);
            (done + w * self.filled(row) as f64, total + w * BOXES_PER_ROW as f64)
        });
        if total > 0.0 { done / total } else { 0.0 }
    }

    /// Weighted completion as the whole percent shown to players
    pub fn weighted_percent(&self) -> u32 {
        (self.weighted_progress() * 100.0).round() as u32
    }
}
