//! Progress display for one or many generation requests

use crate::io::configuration::MAX_INDIVIDUAL_PROGRESS_BARS;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;

/// Coordinates progress display while requests are generated
///
/// Each request gets a bar counting received images against the requested
/// size. Large directories add a single bar counting finished requests and
/// only the most recent requests keep an individual bar.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    batch_bar: Option<ProgressBar>,
    run_bars: Vec<ProgressBar>,
    /// Stores (`name`, `received`, `size`) for rolling window display
    run_states: Vec<(String, usize, usize)>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static RUN_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:30.cyan/blue}] {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Requests: [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            batch_bar: None,
            run_bars: Vec::new(),
            run_states: Vec::new(),
        }
    }

    /// Create bars for `request_count` requests
    pub fn initialize(&mut self, request_count: usize) {
        if request_count > MAX_INDIVIDUAL_PROGRESS_BARS + 1 {
            let batch_bar = ProgressBar::new(request_count as u64);
            batch_bar.set_style(BATCH_STYLE.clone());
            self.batch_bar = Some(self.multi_progress.add(batch_bar));
        }

        for _ in 0..request_count.min(MAX_INDIVIDUAL_PROGRESS_BARS) {
            let bar = ProgressBar::new(0);
            bar.set_style(RUN_STYLE.clone());
            self.run_bars.push(self.multi_progress.add(bar));
        }
    }

    /// Register a request that is about to generate `size` images
    pub fn start_run(&mut self, index: usize, path: &Path, size: usize) {
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        if index >= self.run_states.len() {
            self.run_states.resize(index + 1, (String::new(), 0, 0));
        }
        if let Some(state) = self.run_states.get_mut(index) {
            *state = (display_name, 0, size);
        }
        self.update_bars();
    }

    /// Report how many images have arrived so far
    pub fn update_received(&mut self, index: usize, received: usize) {
        if let Some(state) = self.run_states.get_mut(index) {
            state.1 = received;
        }
        self.update_bars();
    }

    /// Mark a request as done
    ///
    /// An incomplete run keeps its final count and is flagged instead of ticked.
    pub fn complete_run(&mut self, index: usize, received: usize) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.inc(1);
        }

        if let Some(state) = self.run_states.get_mut(index) {
            let mark = if received >= state.2 { "✓" } else { "!" };
            state.0 = format!("{mark} {}", state.0);
            state.1 = received;
        }
        self.update_bars();
    }

    /// Clean up all progress displays
    pub fn finish(&self) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.finish_with_message("All requests processed");
        }
        if let Err(err) = self.multi_progress.clear() {
            tracing::debug!(error = %err, "could not clear progress display");
        }
    }

    /// Number of requests registered so far
    pub fn run_count(&self) -> usize {
        self.run_states.iter().filter(|state| !state.0.is_empty()).count()
    }

    /// Show the last N registered requests
    fn update_bars(&self) {
        let active: Vec<&(String, usize, usize)> = self
            .run_states
            .iter()
            .filter(|state| !state.0.is_empty())
            .collect();

        let start = active.len().saturating_sub(MAX_INDIVIDUAL_PROGRESS_BARS);
        let visible = active.get(start..).unwrap_or(&[]);

        for (bar_index, (name, received, size)) in visible.iter().copied().enumerate() {
            if let Some(bar) = self.run_bars.get(bar_index) {
                bar.set_length(*size as u64);
                bar.set_position(*received as u64);
                let width = size.to_string().len();
                bar.set_message(format!("{received:>width$}/{size}"));
                bar.set_prefix(name.clone());
            }
        }

        for bar_index in visible.len()..self.run_bars.len() {
            if let Some(bar) = self.run_bars.get(bar_index) {
                bar.set_length(0);
                bar.set_position(0);
                bar.set_message(String::new());
                bar.set_prefix(String::new());
            }
        }
    }
}
