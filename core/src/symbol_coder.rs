//! Frame bytes <-> on-air symbol stream
//!
//! Encode order: bytes -> k-bit symbols -> pad to a full interleaver grid ->
//! block interleave (row-major in, column-major out) -> repeat each symbol R times.
//! Decode mirrors it exactly: majority vote per run of R -> de-interleave ->
//! symbols -> bytes.

use crate::config::ModemConfig;
use crate::error::{ModemError, Result};

/// One on-air symbol value (`0..alphabet_size`)
pub type Symbol = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolCoder {
    bits_per_symbol: usize,
    depth: usize,
    repeats: usize,
}

impl SymbolCoder {
    pub fn new(bits_per_symbol: usize, depth: usize, repeats: usize) -> Self {
        debug_assert!((1..=8).contains(&bits_per_symbol));
        Self {
            bits_per_symbol,
            depth: depth.max(1),
            repeats: repeats.max(1),
        }
    }

    pub fn from_config(config: &ModemConfig) -> Self {
        Self::new(
            crate::fsk::bits_per_symbol(config.mode),
            config.interleave_depth,
            config.repeats,
        )
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }

    /// Interleaver grid rows needed for a frame of `frame_len` bytes
    pub fn rows_for(&self, frame_len: usize) -> usize {
        let symbols = (frame_len * 8).div_ceil(self.bits_per_symbol);
        symbols.div_ceil(self.depth).max(1)
    }

    /// Number of symbols transmitted for a frame of `frame_len` bytes
    pub fn transmitted_len(&self, frame_len: usize) -> usize {
        self.rows_for(frame_len) * self.depth * self.repeats
    }

    /// Captured symbols per interleaver grid row
    pub fn symbols_per_row(&self) -> usize {
        self.depth * self.repeats
    }

    pub fn encode(&self, frame: &[u8]) -> Vec<Symbol> {
        let rows = self.rows_for(frame.len());
        let mut logical = self.bytes_to_symbols(frame);
        logical.resize(rows * self.depth, 0);

        let interleaved = self.interleave(&logical, rows);

        let mut transmitted = Vec::with_capacity(interleaved.len() * self.repeats);
        for symbol in interleaved {
            transmitted.extend(std::iter::repeat(symbol).take(self.repeats));
        }

        log::debug!(
            "Symbol coder: {} bytes -> {} logical symbols ({} rows x {}) -> {} on air",
            frame.len(),
            rows * self.depth,
            rows,
            self.depth,
            transmitted.len()
        );

        transmitted
    }

    /// Decode a complete capture. `None` entries are erasures and abstain from the vote.
    pub fn decode(&self, captured: &[Option<Symbol>]) -> Result<Vec<u8>> {
        let per_row = self.symbols_per_row();
        if captured.is_empty() || captured.len() % per_row != 0 {
            return Err(ModemError::Desync(format!(
                "{} captured symbols is not a non-zero multiple of depth {} x repeats {}",
                captured.len(),
                self.depth,
                self.repeats
            )));
        }

        let interleaved: Vec<Symbol> = captured
            .chunks(self.repeats)
            .map(majority_vote)
            .collect();
        let rows = interleaved.len() / self.depth;
        let logical = self.deinterleave(&interleaved, rows);

        Ok(self.symbols_to_bytes(&logical))
    }

    /// Decode only the first `len` bytes of a capture, assuming an interleaver grid of
    /// `rows` rows. Returns `None` when the grid cannot hold that many bytes or the
    /// capture is too short for the grid.
    pub fn peek_bytes(&self, captured: &[Option<Symbol>], rows: usize, len: usize) -> Option<Vec<u8>> {
        let needed = (len * 8).div_ceil(self.bits_per_symbol);
        if rows == 0 || needed > rows * self.depth || captured.len() < rows * self.symbols_per_row() {
            return None;
        }

        let logical: Vec<Symbol> = (0..needed)
            .map(|i| {
                let position = interleaved_position(i, rows, self.depth);
                let start = position * self.repeats;
                majority_vote(&captured[start..start + self.repeats])
            })
            .collect();

        let mut bytes = self.symbols_to_bytes(&logical);
        bytes.truncate(len);
        Some(bytes)
    }

    /// Write row-major into a `rows x depth` grid, read column-major
    fn interleave(&self, logical: &[Symbol], rows: usize) -> Vec<Symbol> {
        let mut out = vec![0; logical.len()];
        for (i, &symbol) in logical.iter().enumerate() {
            out[interleaved_position(i, rows, self.depth)] = symbol;
        }
        out
    }

    fn deinterleave(&self, interleaved: &[Symbol], rows: usize) -> Vec<Symbol> {
        (0..interleaved.len())
            .map(|i| interleaved[interleaved_position(i, rows, self.depth)])
            .collect()
    }

    fn bytes_to_symbols(&self, bytes: &[u8]) -> Vec<Symbol> {
        let k = self.bits_per_symbol;
        let mut symbols = Vec::with_capacity((bytes.len() * 8).div_ceil(k));
        let mut acc: u8 = 0;
        let mut filled = 0;

        for &byte in bytes {
            for shift in (0..8).rev() {
                acc = (acc << 1) | ((byte >> shift) & 1);
                filled += 1;
                if filled == k {
                    symbols.push(acc);
                    acc = 0;
                    filled = 0;
                }
            }
        }

        if filled > 0 {
            symbols.push(acc << (k - filled));
        }

        symbols
    }

    /// Trailing bits that do not fill a whole byte are dropped
    fn symbols_to_bytes(&self, symbols: &[Symbol]) -> Vec<u8> {
        let k = self.bits_per_symbol;
        let mut bytes = Vec::with_capacity(symbols.len() * k / 8);
        let mut acc: u8 = 0;
        let mut filled = 0;

        for &symbol in symbols {
            for shift in (0..k).rev() {
                acc = (acc << 1) | ((symbol >> shift) & 1);
                filled += 1;
                if filled == 8 {
                    bytes.push(acc);
                    acc = 0;
                    filled = 0;
                }
            }
        }

        bytes
    }
}

/// Position on air of logical symbol `index` for a `rows x depth` grid
fn interleaved_position(index: usize, rows: usize, depth: usize) -> usize {
    let row = index / depth;
    let col = index % depth;
    col * rows + row
}

/// Most frequent non-erased value; ties (and all-erased runs) go to the lowest value
fn majority_vote(votes: &[Option<Symbol>]) -> Symbol {
    let mut counts = [0usize; 256];
    for vote in votes.iter().flatten() {
        counts[*vote as usize] += 1;
    }

    let mut best = 0;
    for value in 1..counts.len() {
        if counts[value] > counts[best] {
            best = value;
        }
    }
    best as Symbol
}
