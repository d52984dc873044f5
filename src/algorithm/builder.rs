//! Candidate construction: one greedy randomized pass per attempt
//!
//! A candidate starts from the head of the must-appear-once queue, then visits
//! the remaining eligible layers in random order and takes the first shuffled
//! piece that does not clash with the tags placed so far. A required layer
//! that cannot be filled aborts the whole candidate; the driver retries.

use crate::algorithm::bitset::TagSet;
use crate::algorithm::quota::QuotaTracker;
use crate::catalog::model::Catalog;
use rand::Rng;
use rand::seq::SliceRandom;

/// Layer to piece mapping for one image, at most one piece per layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    choices: Vec<Option<usize>>,
}

impl Assignment {
    /// Create an assignment with every layer skipped
    pub fn new(layer_count: usize) -> Self {
        Self {
            choices: vec![None; layer_count],
        }
    }

    /// Place a piece in a layer, replacing any earlier choice
    pub fn place(&mut self, layer: usize, piece: usize) {
        if let Some(choice) = self.choices.get_mut(layer) {
            *choice = Some(piece);
        }
    }

    /// Skip a layer
    pub fn clear(&mut self, layer: usize) {
        if let Some(choice) = self.choices.get_mut(layer) {
            *choice = None;
        }
    }

    /// Piece chosen for a layer
    pub fn piece_for(&self, layer: usize) -> Option<usize> {
        self.choices.get(layer).copied().flatten()
    }

    /// Test whether a layer has a piece
    pub fn is_assigned(&self, layer: usize) -> bool {
        self.piece_for(layer).is_some()
    }

    /// `(layer, piece)` pairs in layer order
    pub fn placements(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.choices
            .iter()
            .enumerate()
            .filter_map(|(layer, choice)| choice.map(|piece| (layer, piece)))
    }

    /// Number of filled layers
    pub fn len(&self) -> usize {
        self.choices.iter().flatten().count()
    }

    /// Test if every layer is skipped
    pub fn is_empty(&self) -> bool {
        self.choices.iter().all(Option::is_none)
    }

    /// Identifiers of the chosen pieces in layer order
    pub fn piece_ids<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = &'a str> + 'a {
        self.placements()
            .filter_map(|(_, piece)| catalog.piece(piece).map(|entry| entry.id.as_str()))
    }
}

/// Tags contributed and blocked by the choices placed so far
#[derive(Clone, Debug)]
pub struct TagContext {
    used: TagSet,
    blocked: TagSet,
}

impl TagContext {
    /// Create an empty context for a catalog's tag space
    pub fn new(tag_count: usize) -> Self {
        Self {
            used: TagSet::new(tag_count),
            blocked: TagSet::new(tag_count),
        }
    }

    /// Test whether a choice with these tags fits alongside the placed ones
    pub fn admits(&self, tags: &TagSet, blocked_tags: &TagSet) -> bool {
        !tags.intersects(&self.blocked) && !blocked_tags.intersects(&self.used)
    }

    /// Fold a placed choice into the context
    pub fn absorb(&mut self, tags: &TagSet, blocked_tags: &TagSet) {
        self.used.union_with(tags);
        self.blocked.union_with(blocked_tags);
    }

    /// Tags contributed so far
    pub const fn used(&self) -> &TagSet {
        &self.used
    }

    /// Tags blocked so far
    pub const fn blocked(&self) -> &TagSet {
        &self.blocked
    }

    fn reset(&mut self) {
        self.used.clear();
        self.blocked.clear();
    }

    fn absorb_placement(&mut self, catalog: &Catalog, layer: usize, piece: usize) {
        if let Some(entry) = catalog.layer(layer) {
            self.absorb(&entry.tags, &entry.blocked_tags);
        }
        if let Some(entry) = catalog.piece(piece) {
            self.absorb(&entry.tags, &entry.blocked_tags);
        }
    }
}

/// Builds random candidates, reusing scratch buffers between attempts
#[derive(Debug)]
pub struct CandidateBuilder {
    context: TagContext,
    layer_order: Vec<usize>,
    piece_order: Vec<usize>,
}

impl CandidateBuilder {
    /// Create a builder sized for a catalog
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            context: TagContext::new(catalog.tag_count()),
            layer_order: Vec::with_capacity(catalog.layers().len()),
            piece_order: Vec::new(),
        }
    }

    /// Tag context left by the most recent attempt
    pub const fn context(&self) -> &TagContext {
        &self.context
    }

    /// Build one candidate, or `None` when a required layer cannot be filled
    pub fn build<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        quota: &mut QuotaTracker,
        rng: &mut R,
    ) -> Option<Assignment> {
        let Self {
            context,
            layer_order,
            piece_order,
        } = self;

        // An exhausted required layer can never be filled again
        let required_exhausted = catalog
            .layers()
            .iter()
            .enumerate()
            .any(|(index, layer)| layer.required && !quota.is_layer_eligible(index));
        if required_exhausted {
            return None;
        }

        let mut assignment = Assignment::new(catalog.layers().len());
        context.reset();

        if let Some(pick) = quota.next_forced_pick() {
            assignment.place(pick.layer, pick.piece);
            context.absorb_placement(catalog, pick.layer, pick.piece);
        }

        layer_order.clear();
        layer_order.extend(0..quota.sources().len());
        layer_order.shuffle(rng);

        for &position in layer_order.iter() {
            let Some(source) = quota.sources().get(position) else {
                continue;
            };
            if assignment.is_assigned(source.layer) {
                continue;
            }
            let Some(layer) = catalog.layer(source.layer) else {
                continue;
            };

            if !context.admits(&layer.tags, &layer.blocked_tags) {
                if layer.required {
                    return None;
                }
                continue;
            }

            piece_order.clear();
            piece_order.extend(source.pieces.iter().map(|entry| entry.piece));
            piece_order.shuffle(rng);

            let chosen = piece_order.iter().copied().find(|&piece| {
                catalog
                    .piece(piece)
                    .is_some_and(|entry| context.admits(&entry.tags, &entry.blocked_tags))
            });

            match chosen {
                Some(piece) => {
                    assignment.place(source.layer, piece);
                    context.absorb_placement(catalog, source.layer, piece);
                }
                None if layer.required => return None,
                None => {}
            }
        }

        Some(assignment)
    }
}
