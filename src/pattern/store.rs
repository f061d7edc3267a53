/*
Pattern store
=============

A three-axis boolean grid backing one step-sequencer page set. The first two
axes select a bank (two independent bank selectors so a surface can page
through e.g. 4 x 12 variations), the third axis is the step index inside one
cycle.

Storage is bit-packed: each (bank0, bank1) cell owns `ceil(steps / 32)` words.
Resizing an axis only ever zero-fills the cells or words it adds; bits that
were already addressable keep their value. That property is what lets a
surface grow the grid mid-playback without wiping the groove.

All access goes through the embedded lock, held per call. Step and bank
indices are a documented precondition and assert on violation rather than
silently reading out of range.
*/

use std::sync::Arc;

use parking_lot::Mutex;

use crate::port::{Port, PortValue};
use crate::BITS_PER_WORD;

/// Grid dimensions: (bank0, bank1, steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternDim {
    pub bank0: usize,
    pub bank1: usize,
    pub steps: usize,
}

fn words_for(steps: usize) -> usize {
    steps.div_ceil(BITS_PER_WORD)
}

struct Bitmap {
    dim: PatternDim,
    /// cells[i][j] holds the packed step words for bank cell (i, j).
    cells: Vec<Vec<Vec<u32>>>,
}

impl Bitmap {
    fn new(dim: PatternDim) -> Self {
        let cells = (0..dim.bank0)
            .map(|_| (0..dim.bank1).map(|_| vec![0u32; words_for(dim.steps)]).collect())
            .collect();
        Self { dim, cells }
    }

    fn resize(&mut self, dim: PatternDim) {
        let words = words_for(dim.steps);

        // Step axis first: adjust word storage of every surviving cell.
        // Shrinking masks the tail bits of the last kept word so a later
        // regrow reads the reclaimed steps as clear.
        if dim.steps != self.dim.steps {
            for row in &mut self.cells {
                for cell in row.iter_mut() {
                    if dim.steps < self.dim.steps {
                        cell.truncate(words);
                        let tail = dim.steps % BITS_PER_WORD;
                        if tail != 0 {
                            if let Some(last) = cell.last_mut() {
                                *last &= (1u32 << tail) - 1;
                            }
                        }
                    } else {
                        cell.resize(words, 0);
                    }
                }
            }
        }

        // Bank axes: drop excess rows/cells, append zeroed ones.
        for row in &mut self.cells {
            row.truncate(dim.bank1);
            while row.len() < dim.bank1 {
                row.push(vec![0u32; words]);
            }
        }
        self.cells.truncate(dim.bank0);
        while self.cells.len() < dim.bank0 {
            self.cells
                .push((0..dim.bank1).map(|_| vec![0u32; words]).collect());
        }

        self.dim = dim;
    }

    fn check_bounds(&self, i: usize, j: usize, bit: usize) {
        assert!(
            i < self.dim.bank0 && j < self.dim.bank1 && bit < self.dim.steps,
            "pattern access ({}, {}, {}) outside dims ({}, {}, {})",
            i,
            j,
            bit,
            self.dim.bank0,
            self.dim.bank1,
            self.dim.steps
        );
    }

    fn get(&self, i: usize, j: usize, bit: usize) -> bool {
        self.check_bounds(i, j, bit);
        let word = bit / BITS_PER_WORD;
        let mask = 1u32 << (bit % BITS_PER_WORD);
        (self.cells[i][j][word] & mask) != 0
    }

    fn toggle(&mut self, i: usize, j: usize, bit: usize) {
        self.check_bounds(i, j, bit);
        let word = bit / BITS_PER_WORD;
        let mask = 1u32 << (bit % BITS_PER_WORD);
        self.cells[i][j][word] ^= mask;
    }
}

/// Bit-packed step grid with automatable bank-selector ports.
pub struct Pattern {
    bitmap: Mutex<Bitmap>,
    /// Start of the timestamp window this pattern covers.
    timestamp: u64,
    first_index: Arc<Port>,
    second_index: Arc<Port>,
}

impl Pattern {
    pub fn new(dim: PatternDim, timestamp: u64) -> Arc<Self> {
        Arc::new(Self {
            bitmap: Mutex::new(Bitmap::new(dim)),
            timestamp,
            first_index: Port::uint("first-index", 0),
            second_index: Port::uint("second-index", 0),
        })
    }

    pub fn dim(&self) -> PatternDim {
        self.bitmap.lock().dim
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Bank-selector port mirroring the first bank axis.
    pub fn first_index(&self) -> &Arc<Port> {
        &self.first_index
    }

    /// Bank-selector port mirroring the second bank axis.
    pub fn second_index(&self) -> &Arc<Port> {
        &self.second_index
    }

    /// The currently selected bank cell, read from the index ports.
    pub fn selected_bank(&self) -> (usize, usize) {
        (
            self.first_index.safe_read().as_uint() as usize,
            self.second_index.safe_read().as_uint() as usize,
        )
    }

    pub fn select_bank(&self, i: u64, j: u64) {
        self.first_index.safe_write(PortValue::UInt(i));
        self.second_index.safe_write(PortValue::UInt(j));
    }

    /// Resize the grid. Every axis grows or shrinks independently; only
    /// newly added cells and words are zeroed, surviving bits keep their
    /// value.
    pub fn set_dim(&self, dim: PatternDim) {
        self.bitmap.lock().resize(dim);
    }

    /// Read one step bit.
    ///
    /// Indices must be inside the current dims; violations assert.
    pub fn get_bit(&self, i: usize, j: usize, bit: usize) -> bool {
        self.bitmap.lock().get(i, j, bit)
    }

    /// Flip one step bit. Toggling twice restores the original value.
    pub fn toggle_bit(&self, i: usize, j: usize, bit: usize) {
        self.bitmap.lock().toggle(i, j, bit);
    }

    /// Number of set steps in one bank cell (surface display helper).
    pub fn count_set(&self, i: usize, j: usize) -> usize {
        let bitmap = self.bitmap.lock();
        bitmap.check_bounds(i, j, 0);
        bitmap.cells[i][j]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }
}
