//! Remaining-use bookkeeping for limited layers and pieces
//!
//! The tracker owns the working pool of sources still eligible to be drawn and
//! the must-appear-once rotation that gives every piece priority placement
//! before random draws could starve it.

use crate::catalog::model::Catalog;
use bitvec::prelude::*;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Uses left for a layer or piece, `None` when unbounded
pub type Remaining = Option<usize>;

/// Spend one use, reporting whether the budget is now exhausted
fn spend(remaining: &mut Remaining) -> bool {
    remaining.as_mut().is_some_and(|left| {
        *left = left.saturating_sub(1);
        *left == 0
    })
}

/// Eligible piece within a source
#[derive(Clone, Debug)]
pub struct SourcePiece {
    /// Piece arena index
    pub piece: usize,
    /// Uses left before the piece is removed
    pub remaining: Remaining,
    /// Accepted images using this piece
    pub count: usize,
}

/// Eligible layer with its still-eligible pieces
#[derive(Clone, Debug)]
pub struct Source {
    /// Layer arena index
    pub layer: usize,
    /// Uses left before the layer is removed
    pub remaining: Remaining,
    /// Accepted images using this layer
    pub count: usize,
    /// Pieces not yet exhausted (never empty while the source is held)
    pub pieces: Vec<SourcePiece>,
}

/// Piece placed ahead of random selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForcedPick {
    /// Layer arena index
    pub layer: usize,
    /// Piece arena index
    pub piece: usize,
}

/// What a call to [`QuotaTracker::consume`] changed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consumption {
    /// Counts were updated and everything stays eligible
    Counted,
    /// The piece reached its limit and left the pool
    PieceExhausted,
    /// The whole layer left the pool
    LayerExhausted,
    /// The layer was no longer eligible; nothing changed
    Ineligible,
}

/// Per-run quota state
#[derive(Debug)]
pub struct QuotaTracker {
    sources: Vec<Source>,
    forced: VecDeque<ForcedPick>,
    layer_eligible: BitVec,
    piece_eligible: BitVec,
}

impl QuotaTracker {
    /// Seed quotas from declared limits and shuffle the must-appear-once queue
    pub fn new<R: Rng + ?Sized>(catalog: &Catalog, rng: &mut R) -> Self {
        let sources = catalog
            .layers()
            .iter()
            .enumerate()
            .map(|(index, layer)| Source {
                layer: index,
                remaining: layer.limit,
                count: 0,
                pieces: layer
                    .pieces
                    .iter()
                    .filter_map(|&piece| {
                        catalog.piece(piece).map(|entry| SourcePiece {
                            piece,
                            remaining: entry.limit,
                            count: 0,
                        })
                    })
                    .collect(),
            })
            .collect();

        let mut forced: Vec<ForcedPick> = catalog
            .pieces()
            .iter()
            .enumerate()
            .map(|(piece, entry)| ForcedPick {
                layer: entry.layer,
                piece,
            })
            .collect();
        forced.shuffle(rng);

        Self {
            sources,
            forced: forced.into(),
            layer_eligible: bitvec![1; catalog.layers().len()],
            piece_eligible: bitvec![1; catalog.pieces().len()],
        }
    }

    /// Sources still eligible to be drawn
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Source for a layer, if it is still eligible
    pub fn source(&self, layer: usize) -> Option<&Source> {
        self.sources.iter().find(|source| source.layer == layer)
    }

    /// Test whether a layer can still appear in a non-favorite image
    pub fn is_layer_eligible(&self, layer: usize) -> bool {
        self.layer_eligible.get(layer).as_deref() == Some(&true)
    }

    /// Test whether a piece can still appear in a non-favorite image
    pub fn is_piece_eligible(&self, piece: usize) -> bool {
        self.piece_eligible.get(piece).as_deref() == Some(&true)
    }

    /// Pieces still waiting in the must-appear-once queue, head first
    pub fn forced_picks(&self) -> impl Iterator<Item = &ForcedPick> {
        self.forced.iter()
    }

    /// Length of the must-appear-once queue
    pub fn forced_len(&self) -> usize {
        self.forced.len()
    }

    /// Take the head of the must-appear-once queue
    ///
    /// The pick is re-enqueued at the tail so it keeps its priority until
    /// [`consume`](Self::consume) retires it.
    pub fn next_forced_pick(&mut self) -> Option<ForcedPick> {
        let pick = self.forced.pop_front()?;
        self.forced.push_back(pick);
        Some(pick)
    }

    /// Record one accepted use of a piece
    ///
    /// An unlimited piece leaves the must-appear-once queue after its first
    /// use; a limited one stays until its budget runs out. A layer whose budget
    /// runs out, or whose last piece is exhausted, leaves the pool together
    /// with its queued pieces.
    pub fn consume(&mut self, layer: usize, piece: usize) -> Consumption {
        let Some(position) = self.sources.iter().position(|source| source.layer == layer) else {
            return Consumption::Ineligible;
        };
        let Some(source) = self.sources.get_mut(position) else {
            return Consumption::Ineligible;
        };

        source.count += 1;
        let layer_spent = spend(&mut source.remaining);

        let mut outcome = Consumption::Counted;
        if let Some(slot) = source.pieces.iter().position(|entry| entry.piece == piece) {
            let mut piece_spent = false;
            if let Some(entry) = source.pieces.get_mut(slot) {
                entry.count += 1;
                let limited = entry.remaining.is_some();
                piece_spent = spend(&mut entry.remaining);
                if !limited || piece_spent {
                    self.forced.retain(|pick| pick.piece != piece);
                }
            }
            if piece_spent {
                source.pieces.swap_remove(slot);
                self.piece_eligible.set(piece, false);
                outcome = Consumption::PieceExhausted;
            }
        }

        if layer_spent || source.pieces.is_empty() {
            for entry in &source.pieces {
                self.piece_eligible.set(entry.piece, false);
            }
            self.sources.swap_remove(position);
            self.forced.retain(|pick| pick.layer != layer);
            if layer < self.layer_eligible.len() {
                self.layer_eligible.set(layer, false);
            }
            tracing::debug!(layer, "layer left the pool");
            return Consumption::LayerExhausted;
        }

        outcome
    }
}
