//! Command-line interface for batch processing generation requests

use crate::algorithm::executor::GenerationConfig;
use crate::catalog::request::RunRequest;
use crate::io::configuration::{
    DEFAULT_LOG_LEVEL, DEFAULT_SEED, FLUSH_THRESHOLD, OUTPUT_SUFFIX, REQUEST_EXTENSION,
};
use crate::io::error::{GenerationError, Result, file_system, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::io::worker::Generator;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "greedylayers")]
#[command(
    author,
    version,
    about = "Generate unique layered collections using a random greedy algorithm"
)]
/// Command-line arguments for the collection generation tool
pub struct Cli {
    /// Request JSON file or directory of request files to process
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Random seed for reproducible generation
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Override the collection size given in each request
    #[arg(short = 'n', long)]
    pub size: Option<usize>,

    /// Accepted images per streamed batch
    #[arg(short, long, default_value_t = FLUSH_THRESHOLD)]
    pub flush_threshold: usize,

    /// Consecutive failed attempts before a run gives up (defaults to the size)
    #[arg(short = 'b', long)]
    pub failure_bound: Option<usize>,

    /// Compare full canonical keys instead of their hashes
    #[arg(short = 'x', long)]
    pub exact_keys: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Process files even if output exists
    #[arg(long)]
    pub no_skip: bool,

    /// Log level for diagnostics written to stderr
    #[arg(short, long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

impl Cli {
    /// Check if existing output files should be skipped
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Run parameters derived from the arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the flush threshold or failure bound is zero
    pub fn generation_config(&self) -> Result<GenerationConfig> {
        if self.flush_threshold == 0 {
            return Err(invalid_parameter(
                "flush_threshold",
                &self.flush_threshold,
                &"must be at least 1",
            ));
        }
        if self.failure_bound == Some(0) {
            return Err(invalid_parameter(
                "failure_bound",
                &0,
                &"must be at least 1",
            ));
        }
        Ok(GenerationConfig {
            seed: self.seed,
            flush_threshold: self.flush_threshold,
            failure_bound: self.failure_bound,
            exact_keys: self.exact_keys,
        })
    }
}

/// Orchestrates batch processing of request files with progress tracking
pub struct RequestProcessor {
    cli: Cli,
    generator: Generator,
    progress_manager: Option<ProgressManager>,
}

impl RequestProcessor {
    /// Create a new request processor with the given CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the run parameters are invalid
    pub fn new(cli: Cli) -> Result<Self> {
        let generator = Generator::new(cli.generation_config()?);
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Ok(Self {
            cli,
            generator,
            progress_manager,
        })
    }

    /// Process requests according to CLI arguments
    ///
    /// Returns the paths of the written collections.
    ///
    /// # Errors
    ///
    /// Returns an error if target validation, generation or export fails
    pub fn process(&mut self) -> Result<Vec<PathBuf>> {
        let files = self.collect_files()?;

        if files.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.initialize(files.len());
        }

        let mut written = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            written.push(self.process_file(file, index)?);
        }

        if let Some(ref pm) = self.progress_manager {
            pm.finish();
        }

        Ok(written)
    }

    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let target = &self.cli.target;
        if target.is_file() {
            if Self::is_request_file(target) {
                if self.should_process_file(target) {
                    Ok(vec![target.clone()])
                } else {
                    Ok(vec![])
                }
            } else {
                Err(invalid_parameter(
                    "target",
                    &target.display(),
                    &"must be a JSON request file",
                ))
            }
        } else if target.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(target).map_err(file_system(target, "read directory"))? {
                let path = entry.map_err(file_system(target, "read directory"))?.path();
                if Self::is_request_file(&path) && self.should_process_file(&path) {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        } else {
            Err(invalid_parameter(
                "target",
                &target.display(),
                &"must be a JSON request file or directory",
            ))
        }
    }

    /// Test whether `path` looks like a request rather than a written collection
    pub fn is_request_file(path: &Path) -> bool {
        path.is_file()
            && path.extension().and_then(|s| s.to_str()) == Some(REQUEST_EXTENSION)
            && !path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.ends_with(OUTPUT_SUFFIX))
    }

    fn should_process_file(&self, input_path: &Path) -> bool {
        if !self.cli.skip_existing() {
            return true;
        }

        let output_path = Self::get_output_path(input_path);
        if output_path.exists() {
            // Allow print for user feedback for progress messages
            #[allow(clippy::print_stderr)]
            if !self.cli.quiet {
                eprintln!("Skipping: {} (output exists)", input_path.display());
            }
            false
        } else {
            true
        }
    }

    fn process_file(&mut self, input_path: &Path, index: usize) -> Result<PathBuf> {
        let start_time = Instant::now();
        let output_path = Self::get_output_path(input_path);

        let mut request = RunRequest::from_path(input_path)?;
        if let Some(size) = self.cli.size {
            request.size = size;
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.start_run(index, input_path, request.size);
        }

        let job = self.generator.start(&request)?;
        let combinations = job.catalog().combination_count();
        if u64::try_from(request.size).unwrap_or(u64::MAX) > combinations {
            tracing::warn!(
                file = %input_path.display(),
                requested = request.size,
                combinations,
                "requested size exceeds the number of distinct combinations"
            );
        }

        let mut collection = job.collection();
        let progress_manager = &mut self.progress_manager;
        let summary = job.drain(&mut collection, |collection| {
            if let Some(pm) = progress_manager.as_mut() {
                pm.update_received(index, collection.received());
            }
        })?;

        Self::export(&collection.export(), &output_path)?;

        if let Some(ref mut pm) = self.progress_manager {
            pm.complete_run(index, collection.received());
        }

        tracing::info!(
            file = %input_path.display(),
            output = %output_path.display(),
            requested = summary.requested,
            accepted = summary.accepted,
            attempts = summary.attempts,
            conflicts = summary.conflicts,
            duplicates = summary.duplicates,
            elapsed_ms = start_time.elapsed().as_millis(),
            "request processed"
        );
        if !summary.is_complete() {
            tracing::warn!(
                file = %input_path.display(),
                requested = summary.requested,
                accepted = summary.accepted,
                "collection is smaller than requested"
            );
        }

        Ok(output_path)
    }

    fn export(images: &impl serde::Serialize, output_path: &Path) -> Result<()> {
        let file = File::create(output_path).map_err(file_system(output_path, "create"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, images).map_err(|source| {
            GenerationError::Export {
                path: output_path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(file_system(output_path, "write"))
    }

    /// Output path for a request: `<stem>_collection.json` beside the input
    pub fn get_output_path(input_path: &Path) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_default();
        let output_name = format!(
            "{}{}.{}",
            stem.to_string_lossy(),
            OUTPUT_SUFFIX,
            REQUEST_EXTENSION
        );

        if let Some(parent) = input_path.parent() {
            parent.join(output_name)
        } else {
            PathBuf::from(output_name)
        }
    }
}
