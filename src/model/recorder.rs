//! Live run recorder: serialized leaf appends plus published snapshots.
//!
//! Test executors append through a single mutex, so at most one writer
//! touches a run's leaf records at a time. Readers never see that state;
//! they get the last [`ResultsModel`] published with [`RunRecorder::publish`],
//! swapped in whole under a write lock. Background samplers submit health
//! readings through a cloneable [`HealthSink`]; readings are graded on
//! submission and merged on the next publish.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};

use crate::core::errors::{DvError, Result};
use crate::health::grader::{HealthGrader, HealthParameter, HealthReading};
use crate::model::results::{EvaluationPolicy, ResultsModel};
use crate::results::rollup::{StepRecord, SuiteRecord, TestRecord};
use crate::results::verification::{CheckInput, Verification, VerificationRecorder};

/// Bounded capacity of the health-reading channel.
const HEALTH_CHANNEL_CAPACITY: usize = 1024;

/// Run metadata fixed when recording starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunHeader {
    pub title: String,
    pub description: String,
    pub run_id: String,
    pub model: Option<String>,
}

#[derive(Debug, Default)]
struct RecorderState {
    suite: SuiteRecord,
    numbering: VerificationRecorder,
    test_numbers: HashSet<u32>,
    parameters: Vec<HealthParameter>,
}

impl RecorderState {
    fn current_test(&mut self) -> Result<&mut TestRecord> {
        let test = self.suite.tests.last_mut().ok_or_else(|| DvError::Runtime {
            details: "no test case has been started".to_string(),
        })?;
        if !test.executed {
            return Err(DvError::Runtime {
                details: format!("test case {} was recorded as skipped", test.number),
            });
        }
        Ok(test)
    }

    fn current_step(&mut self) -> Result<&mut StepRecord> {
        let test = self.current_test()?;
        let number = test.number;
        test.steps.last_mut().ok_or_else(|| DvError::Runtime {
            details: format!("test case {number} has no step in progress"),
        })
    }

    fn add_test(&mut self, test: TestRecord) -> Result<()> {
        if !self.test_numbers.insert(test.number) {
            return Err(DvError::DuplicateTestNumber {
                number: test.number,
            });
        }
        self.suite.tests.push(test);
        Ok(())
    }
}

/// Producer handle for a background health sampler.
#[derive(Clone)]
pub struct HealthSink {
    tx: Sender<HealthParameter>,
    grader: Arc<HealthGrader>,
}

impl HealthSink {
    /// Grade a reading and queue it for the next publish.
    ///
    /// Unknown severity labels are rejected here, before anything is queued.
    /// A full queue is reported as a retryable runtime error.
    pub fn submit(&self, reading: &HealthReading) -> Result<()> {
        let parameter = self.grader.grade(reading)?;
        match self.tx.try_send(parameter) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DvError::Runtime {
                details: "health reading queue is full; publish before submitting more"
                    .to_string(),
            }),
            Err(TrySendError::Disconnected(_)) => Err(DvError::Runtime {
                details: "run recorder has been dropped".to_string(),
            }),
        }
    }
}

pub struct RunRecorder {
    state: Mutex<RecorderState>,
    published: RwLock<Arc<ResultsModel>>,
    health_tx: Sender<HealthParameter>,
    health_rx: Receiver<HealthParameter>,
    grader: Arc<HealthGrader>,
    policy: EvaluationPolicy,
}

impl RunRecorder {
    #[must_use]
    pub fn new(header: RunHeader, grader: HealthGrader, policy: EvaluationPolicy) -> Self {
        let suite = SuiteRecord {
            title: header.title,
            description: header.description,
            run_id: header.run_id,
            model: header.model,
            ..SuiteRecord::default()
        };
        let initial = ResultsModel::evaluate(&suite, Vec::new(), &policy);
        let (health_tx, health_rx) = bounded(HEALTH_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(RecorderState {
                suite,
                ..RecorderState::default()
            }),
            published: RwLock::new(Arc::new(initial)),
            health_tx,
            health_rx,
            grader: Arc::new(grader),
            policy,
        }
    }

    #[must_use]
    pub fn health_sink(&self) -> HealthSink {
        HealthSink {
            tx: self.health_tx.clone(),
            grader: Arc::clone(&self.grader),
        }
    }

    pub fn begin_test(&self, number: u32, title: &str, description: &str) -> Result<()> {
        self.state.lock().add_test(TestRecord {
            number,
            title: title.to_string(),
            description: description.to_string(),
            executed: true,
            ..TestRecord::default()
        })
    }

    /// Record a test case that will never run.
    pub fn skip_test(&self, number: u32, title: &str, description: &str) -> Result<()> {
        self.state.lock().add_test(TestRecord {
            number,
            title: title.to_string(),
            description: description.to_string(),
            executed: false,
            ..TestRecord::default()
        })
    }

    pub fn begin_step(&self, title: &str, description: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.current_test()?.steps.push(StepRecord {
            title: title.to_string(),
            description: description.to_string(),
            ..StepRecord::default()
        });
        Ok(())
    }

    /// Record a check against the step in progress.
    pub fn record(&self, check: CheckInput) -> Result<Verification> {
        let mut state = self.state.lock();
        // Resolve the step before numbering so a rejected check leaves no gap.
        state.current_step()?;
        let verification = state.numbering.record(check);
        state.current_step()?.verifications.push(verification.clone());
        Ok(verification)
    }

    pub fn abort_step(&self) -> Result<()> {
        self.state.lock().current_step()?.aborted = true;
        Ok(())
    }

    pub fn force_fail_step(&self) -> Result<()> {
        self.state.lock().current_step()?.force_fail = true;
        Ok(())
    }

    pub fn force_fail_test(&self) -> Result<()> {
        self.state.lock().current_test()?.force_fail = true;
        Ok(())
    }

    pub fn abort_suite(&self) {
        self.state.lock().suite.aborted = true;
    }

    pub fn force_fail_suite(&self) {
        self.state.lock().suite.force_fail = true;
    }

    /// Merge queued health readings, re-evaluate and swap the snapshot in.
    pub fn publish(&self) -> Arc<ResultsModel> {
        let mut state = self.state.lock();
        state.parameters.extend(self.health_rx.try_iter());
        let model = Arc::new(ResultsModel::evaluate(
            &state.suite,
            state.parameters.clone(),
            &self.policy,
        ));
        *self.published.write() = Arc::clone(&model);
        model
    }

    /// Last published model. Never a partially updated one.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ResultsModel> {
        self.published.read().clone()
    }
}
