// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-object ingestion into a shared, lock-guarded result pool
//!
//! Every record is built by its own task and the result is appended to one
//! [`SharedResultPool`]. Building happens outside the lock; only the push is
//! guarded. The pool is consumed once every task has been joined.

use super::lane::{get_one, LaneSettings, SkippedRecord};
use crate::error::{panic_message, PipelineError};
use crate::geometry::Solid;
use crate::kernel::{MergeReducer, SolidBuilder};
use crate::record::ObjectRecord;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// A built solid tagged with its record position.
#[derive(Debug)]
pub struct PooledSolid {
    pub index: usize,
    pub id: String,
    pub solid: Solid,
}

/// Append-only collection shared by concurrent producers.
#[derive(Debug, Default)]
pub struct SharedResultPool {
    solids: Mutex<Vec<PooledSolid>>,
    skipped: Mutex<Vec<SkippedRecord>>,
}

impl SharedResultPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one solid. The lock is held for the push only.
    pub fn append(&self, entry: PooledSolid) {
        self.solids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn record_skip(&self, skipped: SkippedRecord) {
        self.skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(skipped);
    }

    pub fn len(&self) -> usize {
        self.solids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pooled solids and skipped records, both in record order.
    pub fn into_parts(self) -> (Vec<PooledSolid>, Vec<SkippedRecord>) {
        let mut solids = self
            .solids
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut skipped = self
            .skipped
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        solids.sort_by_key(|entry| entry.index);
        skipped.sort_by_key(|entry| entry.index);
        (solids, skipped)
    }
}

/// Result of per-object ingestion.
#[derive(Debug)]
pub struct IngestionOutcome {
    pub big: Solid,
    pub built: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Builds every record on its own task and folds the pooled results.
pub struct ObjectIngestion<'k, B: ?Sized, R: ?Sized> {
    builder: &'k B,
    reducer: &'k R,
    settings: LaneSettings,
    max_workers: Option<usize>,
    show_progress: bool,
}

impl<'k, B, R> ObjectIngestion<'k, B, R>
where
    B: SolidBuilder + ?Sized,
    R: MergeReducer + ?Sized,
{
    pub fn new(builder: &'k B, reducer: &'k R, settings: LaneSettings) -> Self {
        Self {
            builder,
            reducer,
            settings,
            max_workers: None,
            show_progress: false,
        }
    }

    /// Use a worker pool of `workers` threads instead of one thread per record.
    pub fn with_max_workers(mut self, workers: Option<usize>) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self, records: &[ObjectRecord]) -> Result<IngestionOutcome, PipelineError> {
        let pool = SharedResultPool::new();
        let progress = self.progress_bar(records.len());

        tracing::debug!(records = records.len(), workers = ?self.max_workers, "ingesting objects");
        match self.max_workers {
            Some(workers) => self.run_bounded(records, &pool, &progress, workers)?,
            None => self.run_unbounded(records, &pool, &progress)?,
        }
        progress.finish_and_clear();

        let (solids, skipped) = pool.into_parts();
        let built = solids.len();
        let big = solids
            .into_iter()
            .fold(self.reducer.empty(), |total, entry| {
                self.reducer.union(total, entry.solid)
            });

        Ok(IngestionOutcome {
            big,
            built,
            skipped,
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    }

    fn ingest(&self, pool: &SharedResultPool, index: usize, record: &ObjectRecord) {
        match get_one(record, self.builder, self.reducer, &self.settings) {
            Ok(solid) => pool.append(PooledSolid {
                index,
                id: record.id().to_string(),
                solid,
            }),
            Err(error) => {
                tracing::warn!(id = record.id(), %error, "skipping object");
                pool.record_skip(SkippedRecord::new(index, record, &error));
            }
        }
    }

    /// One scoped thread per record.
    fn run_unbounded(
        &self,
        records: &[ObjectRecord],
        pool: &SharedResultPool,
        progress: &ProgressBar,
    ) -> Result<(), PipelineError> {
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(records.len());
            let mut failure = None;

            for (index, record) in records.iter().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("object-{index}"))
                    .spawn_scoped(scope, move || {
                        self.ingest(pool, index, record);
                        progress.inc(1);
                    });
                match spawned {
                    Ok(handle) => handles.push((index, handle)),
                    Err(source) => {
                        failure = Some(PipelineError::LaneSpawn {
                            lane: format!("object-{index}"),
                            source,
                        });
                        break;
                    }
                }
            }

            // Join everything that started before reporting anything.
            for (index, handle) in handles {
                if let Err(payload) = handle.join() {
                    failure.get_or_insert(PipelineError::JoinFailure {
                        lane: format!("object-{index}"),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }

            failure.map_or(Ok(()), Err)
        })
    }

    /// A rayon pool of `workers` threads.
    fn run_bounded(
        &self,
        records: &[ObjectRecord],
        pool: &SharedResultPool,
        progress: &ProgressBar,
        workers: usize,
    ) -> Result<(), PipelineError> {
        let workers_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ingest-{i}"))
            .build()?;

        let mut failures: Vec<(usize, String)> = workers_pool.install(|| {
            records
                .par_iter()
                .enumerate()
                .filter_map(|(index, record)| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.ingest(pool, index, record)
                    }));
                    progress.inc(1);
                    outcome
                        .err()
                        .map(|payload| (index, panic_message(payload.as_ref())))
                })
                .collect()
        });

        failures.sort_by_key(|(index, _)| *index);
        match failures.into_iter().next() {
            Some((index, message)) => Err(PipelineError::JoinFailure {
                lane: format!("object-{index}"),
                message,
            }),
            None => Ok(()),
        }
    }
}
