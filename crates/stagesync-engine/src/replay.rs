//! Batch replay: applying a job descriptor through a transactional seam.
//!
//! The replayer owns order and atomicity; the execution layer owns how an
//! entry is actually applied. Batches run in descriptor order and entries in
//! batch order. The first failing entry rolls its batch back, and every entry
//! of that batch is reported failed, since nothing from the batch was
//! applied. Later batches still run. The core performs no retries.

use tracing::{info, instrument, warn};

use crate::error::{SyncError, SyncResult};
use crate::job::descriptor::{
    JobDescriptor, TransactionJobDescriptor, TransactionJobDescriptorEntry,
};
use crate::summary::{Summary, SyncErrorItem, SyncResultItem};

/// One open transaction over a target environment.
pub trait BatchTransaction {
    /// Apply one entry inside the transaction.
    fn apply(&mut self, entry: &TransactionJobDescriptorEntry) -> SyncResult<()>;

    /// Commit everything applied so far.
    fn commit(self: Box<Self>) -> SyncResult<()>;

    /// Discard everything applied so far.
    fn rollback(self: Box<Self>) -> SyncResult<()>;
}

/// Opens transactions, one per batch.
pub trait TransactionDemarcation {
    /// Begin a transaction for the named batch.
    fn begin(&self, batch: &str) -> SyncResult<Box<dyn BatchTransaction>>;
}

/// Replays job descriptors batch by batch.
#[derive(Debug, Default)]
pub struct JobReplayer;

impl JobReplayer {
    /// Create a replayer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Replay `job` through `demarcation`, returning the run summary.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub fn replay(&self, job: &JobDescriptor, demarcation: &dyn TransactionDemarcation) -> Summary {
        let mut summary = Summary::start(job.id);
        for batch in &job.transaction_jobs {
            match self.replay_batch(batch, demarcation) {
                Ok(()) => {
                    for entry in &batch.entries {
                        summary.success_results.push(result_item(batch.name.clone(), entry));
                    }
                }
                Err(err) => {
                    warn!(batch = %batch.name, error = %err, "batch failed, rolled back");
                    let message = err.to_string();
                    for entry in &batch.entries {
                        summary.errors.push(SyncErrorItem {
                            item: result_item(batch.name.clone(), entry),
                            message: message.clone(),
                        });
                    }
                }
            }
        }
        summary.finish();
        info!(
            applied = summary.success_results.len(),
            failed = summary.number_of_errors(),
            "replay finished"
        );
        summary
    }

    /// Apply one batch atomically. Any entry failure rolls the whole batch
    /// back and surfaces as a batch error.
    fn replay_batch(
        &self,
        batch: &TransactionJobDescriptor,
        demarcation: &dyn TransactionDemarcation,
    ) -> SyncResult<()> {
        let mut tx = demarcation.begin(&batch.name)?;
        for entry in &batch.entries {
            if let Err(err) = tx.apply(entry) {
                tx.rollback()?;
                return Err(SyncError::batch(batch.name.clone(), err.to_string()));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn result_item(batch: String, entry: &TransactionJobDescriptorEntry) -> SyncResultItem {
    SyncResultItem {
        guid: entry.guid.clone(),
        type_key: entry.type_key.clone(),
        command: entry.command,
        batch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Command;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Transaction double recording apply/commit/rollback calls and failing
    /// on configured guids.
    struct RecordingTx {
        log: Rc<RefCell<Vec<String>>>,
        fail_on: Vec<String>,
    }

    impl BatchTransaction for RecordingTx {
        fn apply(&mut self, entry: &TransactionJobDescriptorEntry) -> SyncResult<()> {
            if self.fail_on.contains(&entry.guid.as_str().to_string()) {
                return Err(SyncError::internal(format!("apply failed: {}", entry.guid)));
            }
            self.log.borrow_mut().push(format!("apply:{}", entry.guid));
            Ok(())
        }

        fn commit(self: Box<Self>) -> SyncResult<()> {
            self.log.borrow_mut().push("commit".into());
            Ok(())
        }

        fn rollback(self: Box<Self>) -> SyncResult<()> {
            self.log.borrow_mut().push("rollback".into());
            Ok(())
        }
    }

    struct RecordingDemarcation {
        log: Rc<RefCell<Vec<String>>>,
        fail_on: Vec<String>,
    }

    impl TransactionDemarcation for RecordingDemarcation {
        fn begin(&self, batch: &str) -> SyncResult<Box<dyn BatchTransaction>> {
            self.log.borrow_mut().push(format!("begin:{batch}"));
            Ok(Box::new(RecordingTx {
                log: Rc::clone(&self.log),
                fail_on: self.fail_on.clone(),
            }))
        }
    }

    fn job(batches: Vec<(&str, Vec<&str>)>) -> JobDescriptor {
        let mut job = JobDescriptor::new();
        for (name, guids) in batches {
            let mut batch = TransactionJobDescriptor::new(name);
            for guid in guids {
                batch.entries.push(TransactionJobDescriptorEntry::new(
                    "catalog.product",
                    guid,
                    Command::Update,
                ));
            }
            job.push(batch);
        }
        job
    }

    #[test]
    fn test_successful_replay_commits_each_batch() {
        let demarcation = RecordingDemarcation {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_on: Vec::new(),
        };
        let job = job(vec![("b1", vec!["P-1", "P-2"]), ("b2", vec!["P-3"])]);

        let summary = JobReplayer::new().replay(&job, &demarcation);

        assert!(!summary.has_errors());
        assert_eq!(summary.updated(), 3);
        assert_eq!(
            *demarcation.log.borrow(),
            vec![
                "begin:b1",
                "apply:P-1",
                "apply:P-2",
                "commit",
                "begin:b2",
                "apply:P-3",
                "commit"
            ]
        );
    }

    #[test]
    fn test_failure_rolls_back_whole_batch() {
        let demarcation = RecordingDemarcation {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_on: vec!["P-2".into()],
        };
        let job = job(vec![("b1", vec!["P-1", "P-2", "P-3"]), ("b2", vec!["P-4"])]);

        let summary = JobReplayer::new().replay(&job, &demarcation);

        // Every entry of the failed batch is reported failed; the later
        // batch still ran.
        assert_eq!(summary.number_of_errors(), 3);
        assert_eq!(summary.updated(), 1);
        assert!(summary
            .errors
            .iter()
            .all(|error| error.item.batch == "b1"));
        assert_eq!(
            *demarcation.log.borrow(),
            vec![
                "begin:b1",
                "apply:P-1",
                "rollback",
                "begin:b2",
                "apply:P-4",
                "commit"
            ]
        );
    }
}
