use crate::{
    algorithm::allocator::IdAllocator,
    algorithm::builder::{Assignment, CandidateBuilder},
    algorithm::ledger::{UniquenessLedger, canonical_key},
    algorithm::quota::QuotaTracker,
    catalog::favorites::{Favorite, FavoriteBag, resolve_favorite},
    catalog::model::Catalog,
    catalog::request::RunRequest,
    io::configuration::{DEFAULT_SEED, FLUSH_THRESHOLD},
};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::VecDeque;
use std::sync::Arc;

/// Run parameters controlling batching and termination
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Seed for every random choice in the run
    pub seed: u64,
    /// Accepted images collected before a batch is emitted
    pub flush_threshold: usize,
    /// Consecutive failures tolerated before giving up; defaults to the run size
    pub failure_bound: Option<usize>,
    /// Compare canonical strings instead of hashed keys for uniqueness
    pub exact_keys: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            flush_threshold: FLUSH_THRESHOLD,
            failure_bound: None,
            exact_keys: false,
        }
    }
}

/// Seeded random source for reproducible runs
#[derive(Debug)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Create a deterministic random selector
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Borrow the underlying generator
    pub const fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// An accepted image; frozen once emitted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    number: usize,
    key: u64,
    favorite: Option<String>,
    assignment: Assignment,
}

impl Image {
    /// Assemble an image from parts whose key is already known
    pub const fn new(
        number: usize,
        key: u64,
        favorite: Option<String>,
        assignment: Assignment,
    ) -> Self {
        Self {
            number,
            key,
            favorite,
            assignment,
        }
    }

    /// Assemble an image, deriving its canonical key
    pub fn compose(
        number: usize,
        assignment: Assignment,
        favorite: Option<String>,
        catalog: &Catalog,
    ) -> Self {
        let key = canonical_key(&assignment, catalog);
        Self::new(number, key, favorite, assignment)
    }

    /// Output number in `1..=size`
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Canonical key
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// Favorite id this image was generated from
    pub fn favorite(&self) -> Option<&str> {
        self.favorite.as_deref()
    }

    /// Layer to piece choices
    pub const fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Identifiers of the chosen pieces in layer order
    pub fn attribute_ids(&self, catalog: &Catalog) -> Vec<String> {
        self.assignment
            .piece_ids(catalog)
            .map(str::to_string)
            .collect()
    }

    /// Copy of this image with a different favorite mark
    #[must_use]
    pub fn with_favorite(&self, favorite: Option<String>) -> Self {
        Self {
            favorite,
            ..self.clone()
        }
    }
}

/// How a finished run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Every requested image was accepted
    Complete,
    /// The consecutive-failure bound was hit first
    Exhausted,
}

/// Driver lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Attempts are still being made
    Running,
    /// No further images will be produced
    Finished(Completion),
}

/// Why a candidate was discarded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// A required layer could not be filled without a tag clash
    Conflict,
    /// The canonical key was already accepted
    Duplicate,
}

/// Result of a single attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// An image was accepted under this output number
    Accepted {
        /// Output number handed to the image
        number: usize,
    },
    /// The candidate was discarded
    Rejected(Rejection),
    /// The run is over
    Finished(Completion),
}

/// Counters describing a run so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Requested collection size
    pub requested: usize,
    /// Images accepted
    pub accepted: usize,
    /// Candidates attempted
    pub attempts: usize,
    /// Candidates aborted on tag conflicts or exhausted required layers
    pub conflicts: usize,
    /// Candidates rejected as duplicates
    pub duplicates: usize,
    /// Set once the run has finished
    pub completion: Option<Completion>,
}

impl RunSummary {
    /// Test whether the run produced every requested image
    pub fn is_complete(&self) -> bool {
        self.completion == Some(Completion::Complete)
    }
}

/// Generation driver owning every piece of per-run state
///
/// Favorites are applied first, in order, bypassing tag and limit checks.
/// Random candidates follow until the requested count is reached or too many
/// consecutive attempts fail.
#[derive(Debug)]
pub struct GenerationDriver {
    catalog: Arc<Catalog>,
    quota: QuotaTracker,
    ledger: UniquenessLedger,
    allocator: IdAllocator,
    favorites: VecDeque<Favorite>,
    builder: CandidateBuilder,
    random_selector: RandomSelector,
    flush_threshold: usize,
    failure_bound: usize,
    failures: usize,
    state: RunState,
    batch: Vec<Image>,
    summary: RunSummary,
}

impl GenerationDriver {
    /// Prepare a run over a catalog snapshot
    pub fn new(
        catalog: Arc<Catalog>,
        favorites: &FavoriteBag,
        size: usize,
        config: GenerationConfig,
    ) -> Self {
        let mut random_selector = RandomSelector::new(config.seed);
        let allocator = IdAllocator::new(size, random_selector.rng());
        let quota = QuotaTracker::new(&catalog, random_selector.rng());
        let builder = CandidateBuilder::new(&catalog);
        let flush_threshold = config.flush_threshold.max(1);

        Self {
            catalog,
            quota,
            ledger: if config.exact_keys {
                UniquenessLedger::exact()
            } else {
                UniquenessLedger::new()
            },
            allocator,
            favorites: favorites.iter().cloned().collect(),
            builder,
            random_selector,
            flush_threshold,
            failure_bound: config.failure_bound.unwrap_or(size).max(1),
            failures: 0,
            state: RunState::Running,
            batch: Vec::with_capacity(flush_threshold.min(size)),
            summary: RunSummary {
                requested: size,
                ..RunSummary::default()
            },
        }
    }

    /// Prepare a run straight from a request
    ///
    /// # Errors
    ///
    /// Returns an error if the request's catalog is invalid
    pub fn from_request(request: &RunRequest, config: GenerationConfig) -> crate::Result<Self> {
        let catalog = Arc::new(Catalog::from_request(request)?);
        Ok(Self::new(catalog, &request.favorites, request.size, config))
    }

    /// Catalog snapshot the run draws from
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Quota state
    pub const fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Keys accepted so far
    pub const fn ledger(&self) -> &UniquenessLedger {
        &self.ledger
    }

    /// Current lifecycle state
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Counters so far
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Consecutive failures since the last accepted image
    pub const fn consecutive_failures(&self) -> usize {
        self.failures
    }

    /// Make one attempt at a new image
    pub fn run_attempt(&mut self) -> Attempt {
        if let RunState::Finished(completion) = self.state {
            return Attempt::Finished(completion);
        }
        if self.allocator.is_exhausted() {
            return self.finish(Completion::Complete);
        }

        self.summary.attempts += 1;

        let (assignment, favorite) = match self.favorites.pop_front() {
            Some(favorite) => (
                resolve_favorite(&self.catalog, &favorite.pieces),
                Some(favorite.id),
            ),
            None => {
                let built = self.builder.build(
                    &self.catalog,
                    &mut self.quota,
                    self.random_selector.rng(),
                );
                match built {
                    Some(assignment) => (assignment, None),
                    None => return self.reject(Rejection::Conflict),
                }
            }
        };

        let Some(key) = self.ledger.admit(&assignment, &self.catalog) else {
            return self.reject(Rejection::Duplicate);
        };

        self.failures = 0;
        if favorite.is_none() {
            for (layer, piece) in assignment.placements() {
                self.quota.consume(layer, piece);
            }
        }

        let Some(number) = self.allocator.next_number() else {
            return self.finish(Completion::Complete);
        };
        self.batch.push(Image::new(number, key, favorite, assignment));
        self.summary.accepted += 1;

        Attempt::Accepted { number }
    }

    /// Run attempts until a batch is full or the run ends
    ///
    /// Returns `None` once the run is finished and every image was emitted.
    pub fn next_batch(&mut self) -> Option<Vec<Image>> {
        loop {
            if self.batch.len() >= self.flush_threshold {
                return Some(std::mem::take(&mut self.batch));
            }
            if let Attempt::Finished(_) = self.run_attempt() {
                return (!self.batch.is_empty()).then(|| std::mem::take(&mut self.batch));
            }
        }
    }

    /// Run to the end, collecting every image
    pub fn run_to_end(&mut self) -> Vec<Image> {
        let mut images = Vec::with_capacity(self.summary.requested);
        while let Some(batch) = self.next_batch() {
            images.extend(batch);
        }
        images
    }

    fn reject(&mut self, rejection: Rejection) -> Attempt {
        match rejection {
            Rejection::Conflict => self.summary.conflicts += 1,
            Rejection::Duplicate => self.summary.duplicates += 1,
        }
        self.failures += 1;
        if self.failures >= self.failure_bound {
            self.finish(Completion::Exhausted);
        }
        Attempt::Rejected(rejection)
    }

    fn finish(&mut self, completion: Completion) -> Attempt {
        self.state = RunState::Finished(completion);
        self.summary.completion = Some(completion);
        match completion {
            Completion::Complete => tracing::info!(
                accepted = self.summary.accepted,
                attempts = self.summary.attempts,
                "generation complete"
            ),
            Completion::Exhausted => tracing::warn!(
                accepted = self.summary.accepted,
                requested = self.summary.requested,
                failures = self.failures,
                "generation stopped after consecutive failures"
            ),
        }
        Attempt::Finished(completion)
    }
}
