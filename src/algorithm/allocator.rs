use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffled pool of output numbers `1..=size`
///
/// Numbers are handed out as images are accepted, so an image's number says
/// nothing about when or how it was generated.
#[derive(Debug)]
pub struct IdAllocator {
    numbers: Vec<usize>,
}

impl IdAllocator {
    /// Build and shuffle the full permutation up front
    pub fn new<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let mut numbers: Vec<usize> = (1..=size).collect();
        numbers.shuffle(rng);
        Self { numbers }
    }

    /// Take the next output number
    pub fn next_number(&mut self) -> Option<usize> {
        self.numbers.pop()
    }

    /// Numbers not yet handed out
    pub fn remaining(&self) -> usize {
        self.numbers.len()
    }

    /// Test whether every number was handed out
    pub fn is_exhausted(&self) -> bool {
        self.numbers.is_empty()
    }
}
