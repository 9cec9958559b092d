// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Two-lane fork-join coordinator
//!
//! The first subset runs on a spawned, scoped thread while the coordinator's
//! own thread runs the second subset. The spawned lane is always joined before
//! the two totals are combined, and before any error is returned.

use super::lane::{run_lane, Lane, LaneOutput, LaneSettings, LaneSummary};
use crate::error::{panic_message, PipelineError};
use crate::geometry::Solid;
use crate::kernel::{MergeReducer, SolidBuilder};
use crate::record::ObjectRecord;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Lifecycle of a coordinator. It only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Running,
    Joined,
}

/// Combined result of both lanes.
#[derive(Debug)]
pub struct ForkJoinOutcome {
    pub big: Solid,
    /// First lane, then second lane
    pub lanes: [LaneSummary; 2],
}

/// Runs one subset concurrently and the other inline, then combines them.
pub struct FanOutCoordinator<'k, B: ?Sized, R: ?Sized> {
    builder: &'k B,
    reducer: &'k R,
    settings: LaneSettings,
    state: CoordinatorState,
}

fn join_failure(lane: Lane, payload: Box<dyn Any + Send>) -> PipelineError {
    PipelineError::JoinFailure {
        lane: lane.to_string(),
        message: panic_message(payload.as_ref()),
    }
}

impl<'k, B, R> FanOutCoordinator<'k, B, R>
where
    B: SolidBuilder + ?Sized,
    R: MergeReducer + ?Sized,
{
    pub fn new(builder: &'k B, reducer: &'k R, settings: LaneSettings) -> Self {
        Self {
            builder,
            reducer,
            settings,
            state: CoordinatorState::Idle,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Fork on `first`, run `second` inline, join, combine.
    ///
    /// Fails with [`PipelineError::CoordinatorReused`] unless the coordinator is idle.
    pub fn run(
        &mut self,
        first: &[ObjectRecord],
        second: &[ObjectRecord],
    ) -> Result<ForkJoinOutcome, PipelineError> {
        if self.state != CoordinatorState::Idle {
            return Err(PipelineError::CoordinatorReused);
        }
        self.state = CoordinatorState::Running;
        tracing::info!(first = first.len(), second = second.len(), "forking lanes");

        let result = self.fork_join(first, second);
        self.state = CoordinatorState::Joined;
        result
    }

    fn fork_join(
        &self,
        first: &[ObjectRecord],
        second: &[ObjectRecord],
    ) -> Result<ForkJoinOutcome, PipelineError> {
        let (builder, reducer, settings) = (self.builder, self.reducer, &self.settings);

        let (spawned, inline) = thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name(Lane::First.to_string())
                .spawn_scoped(scope, move || {
                    run_lane(Lane::First, first, 0, builder, reducer, settings)
                })
                .map_err(|source| PipelineError::LaneSpawn {
                    lane: Lane::First.to_string(),
                    source,
                })?;

            let inline = panic::catch_unwind(AssertUnwindSafe(|| {
                run_lane(Lane::Second, second, first.len(), builder, reducer, settings)
            }));

            Ok::<_, PipelineError>((handle.join(), inline))
        })?;

        let first_lane: LaneOutput = spawned.map_err(|payload| join_failure(Lane::First, payload))?;
        let second_lane: LaneOutput = inline.map_err(|payload| join_failure(Lane::Second, payload))?;

        let big = reducer.union(first_lane.total, second_lane.total);
        tracing::debug!(cells = big.cell_count(), "lanes joined");

        Ok(ForkJoinOutcome {
            big,
            lanes: [first_lane.summary, second_lane.summary],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::geometry::{Lattice, Primitive, Span};
    use crate::kernel::ColumnKernel;
    use crate::pipeline::split;
    use nalgebra::Point3;
    use std::io;
    use std::sync::{Arc, Mutex};

    const SETTINGS: LaneSettings = LaneSettings {
        triangulate: false,
        offset: None,
    };

    fn records(n: usize) -> Vec<ObjectRecord> {
        (0..n)
            .map(|i| {
                let x = (i * 2) as f64;
                Primitive::block(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
                    .to_record(format!("b{i}"), 2.2)
            })
            .collect()
    }

    /// Builds from the record id alone and panics on demand.
    struct IdBuilder;

    impl SolidBuilder for IdBuilder {
        fn build(&self, record: &ObjectRecord, _triangulate: bool) -> Result<Solid, BuildError> {
            if record.id() == "panic" {
                panic!("kernel crashed on {}", record.id());
            }
            let mut solid = Solid::empty();
            solid.insert((record.id().len() as i64, 0), Span::new(0, 1));
            Ok(solid)
        }
    }

    #[test]
    fn test_fork_join_matches_sequential() {
        let kernel = ColumnKernel::new(Lattice::new(1.0));
        let records = records(7);
        let (first, second) = split(&records);

        let mut coordinator = FanOutCoordinator::new(&kernel, &kernel, SETTINGS);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        let outcome = coordinator.run(first, second).unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Joined);

        let sequential = run_lane(Lane::Whole, &records, 0, &kernel, &kernel, &SETTINGS);
        assert_eq!(outcome.big, sequential.total);
        assert_eq!(outcome.lanes[0].records, 3);
        assert_eq!(outcome.lanes[1].records, 4);
    }

    /// Collects formatted log lines.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lane_sizes_logged_at_info() {
        let kernel = ColumnKernel::new(Lattice::new(1.0));
        let records = records(5);
        let (first, second) = split(&records);

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            FanOutCoordinator::new(&kernel, &kernel, SETTINGS)
                .run(first, second)
                .unwrap();
        });

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("forking lanes"));
        assert!(logs.contains("first=2"));
        assert!(logs.contains("second=3"));
    }

    #[test]
    fn test_empty_subsets() {
        let kernel = ColumnKernel::new(Lattice::new(1.0));
        let mut coordinator = FanOutCoordinator::new(&kernel, &kernel, SETTINGS);
        let outcome = coordinator.run(&[], &[]).unwrap();
        assert!(outcome.big.is_empty());
    }

    #[test]
    fn test_reuse_is_rejected() {
        let kernel = ColumnKernel::new(Lattice::new(1.0));
        let mut coordinator = FanOutCoordinator::new(&kernel, &kernel, SETTINGS);
        coordinator.run(&[], &[]).unwrap();

        assert!(matches!(
            coordinator.run(&[], &[]),
            Err(PipelineError::CoordinatorReused)
        ));
    }

    #[test]
    fn test_spawned_lane_panic_is_reported() {
        let kernel = ColumnKernel::new(Lattice::new(1.0));
        let records = vec![ObjectRecord::new("panic", 2.2, Vec::new()), ObjectRecord::new("ok", 2.2, Vec::new())];
        let (first, second) = split(&records);

        let mut coordinator = FanOutCoordinator::new(&IdBuilder, &kernel, SETTINGS);
        match coordinator.run(first, second) {
            Err(PipelineError::JoinFailure { lane, message }) => {
                assert_eq!(lane, "lane-a");
                assert!(message.contains("kernel crashed on panic"));
            }
            other => panic!("expected join failure, got {other:?}"),
        }
        assert_eq!(coordinator.state(), CoordinatorState::Joined);
    }

    #[test]
    fn test_inline_lane_panic_is_reported() {
        let kernel = ColumnKernel::new(Lattice::new(1.0));
        let records = vec![ObjectRecord::new("ok", 2.2, Vec::new()), ObjectRecord::new("panic", 2.2, Vec::new())];
        let (first, second) = split(&records);

        let mut coordinator = FanOutCoordinator::new(&IdBuilder, &kernel, SETTINGS);
        assert!(matches!(
            coordinator.run(first, second),
            Err(PipelineError::JoinFailure { lane, .. }) if lane == "lane-b"
        ));
    }
}
