//! In-memory job store.
//!
//! Applies the same conditional transitions as the PostgreSQL store under a
//! single write lock, so each operation is atomic with respect to the others.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use orchestrator_core::error::AppError;
use orchestrator_core::{AppResult, JobId};
use orchestrator_entity::job::{Job, JobError, JobStatus, NewJob};

use crate::store::{JobCounts, JobStore, merge_error};

/// Job store that keeps records in a process-local map.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record verbatim, timestamps included.
    pub async fn put(&self, job: Job) {
        self.jobs.write().await.insert(job.job_id, job);
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn transition<F>(&self, job_id: JobId, apply: F) -> bool
    where
        F: FnOnce(&mut Job) -> bool,
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job_id) {
            Some(job) => {
                let changed = apply(job);
                if changed {
                    job.updated_at = Utc::now();
                }
                changed
            }
            None => false,
        }
    }

    async fn fail_where<P>(&self, matches: P, error: &JobError) -> Vec<JobId>
    where
        P: Fn(&Job) -> bool,
    {
        let now = Utc::now();
        let patch = error.to_value();
        let mut jobs = self.jobs.write().await;
        let mut affected: Vec<JobId> = jobs
            .values_mut()
            .filter(|job| job.status.can_transition_to(JobStatus::Failed) && matches(job))
            .map(|job| {
                job.status = JobStatus::Failed;
                job.result = None;
                job.error = Some(merge_error(job.error.as_ref(), &patch));
                job.finished_at = Some(now);
                job.updated_at = now;
                job.job_id
            })
            .collect();
        affected.sort();
        affected
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_queued(&self, job: &NewJob) -> AppResult<Job> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.job_id) {
            return Err(AppError::conflict(format!(
                "Job {} already exists",
                job.job_id
            )));
        }
        let record = Job::queued(job, Utc::now());
        jobs.insert(job.job_id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, job_id: JobId) -> AppResult<Option<Job>> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn mark_running(&self, job_id: JobId) -> AppResult<bool> {
        Ok(self
            .transition(job_id, |job| {
                job.status = JobStatus::Running;
                job.result = None;
                job.error = None;
                job.started_at = Some(Utc::now());
                job.finished_at = None;
                true
            })
            .await)
    }

    async fn mark_running_if_queued(&self, job_id: JobId) -> AppResult<bool> {
        Ok(self
            .transition(job_id, |job| {
                if !job.status.can_transition_to(JobStatus::Running) {
                    return false;
                }
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
                true
            })
            .await)
    }

    async fn mark_succeeded(&self, job_id: JobId, result: &serde_json::Value) -> AppResult<bool> {
        Ok(self
            .transition(job_id, |job| {
                if !job.status.can_transition_to(JobStatus::Succeeded) {
                    return false;
                }
                job.status = JobStatus::Succeeded;
                job.result = Some(result.clone());
                job.error = None;
                job.finished_at = Some(Utc::now());
                true
            })
            .await)
    }

    async fn mark_failed(&self, job_id: JobId, error: &JobError) -> AppResult<bool> {
        Ok(self
            .transition(job_id, |job| {
                if !job.status.can_transition_to(JobStatus::Failed) {
                    return false;
                }
                job.status = JobStatus::Failed;
                job.error = Some(error.to_value());
                job.result = None;
                job.finished_at = Some(Utc::now());
                true
            })
            .await)
    }

    async fn fail_stale_running(
        &self,
        started_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>> {
        Ok(self
            .fail_where(
                |job| {
                    job.status == JobStatus::Running
                        && job.started_at.is_some_and(|t| t < started_before)
                },
                error,
            )
            .await)
    }

    async fn expire_stale_queued(
        &self,
        created_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>> {
        Ok(self
            .fail_where(
                |job| job.status == JobStatus::Queued && job.created_at < created_before,
                error,
            )
            .await)
    }

    async fn purge_finished(&self, finished_before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.status.is_terminal() && job.finished_at.is_some_and(|t| t < finished_before))
        });
        Ok((before - jobs.len()) as u64)
    }

    async fn count_by_status(&self) -> AppResult<JobCounts> {
        let jobs = self.jobs.read().await;
        let mut counts = JobCounts::default();
        for job in jobs.values() {
            counts.add(job.status, 1);
        }
        Ok(counts)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use orchestrator_entity::job::FailureReason;
    use serde_json::json;

    use super::*;

    async fn queued(store: &MemoryJobStore) -> JobId {
        store
            .insert_queued(&NewJob::new("echo", json!({ "task": "x" })))
            .await
            .expect("insert")
            .job_id
    }

    #[tokio::test]
    async fn test_happy_path_transitions() {
        let store = MemoryJobStore::new();
        let id = queued(&store).await;

        assert!(store.mark_running(id).await.unwrap());
        let running = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.started_at.is_some());

        assert!(store.mark_succeeded(id, &json!({ "ok": true })).await.unwrap());
        let done = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
        assert_eq!(done.result, Some(json!({ "ok": true })));
        assert!(done.error.is_none());
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemoryJobStore::new();
        let new = NewJob::new("echo", json!({}));
        store.insert_queued(&new).await.unwrap();
        assert!(store.insert_queued(&new).await.is_err());
    }

    #[tokio::test]
    async fn test_unconditional_running_clears_previous_outcome() {
        let store = MemoryJobStore::new();
        let id = queued(&store).await;
        store.mark_running(id).await.unwrap();
        store
            .mark_failed(id, &JobError::new(FailureReason::RunnerError, "boom"))
            .await
            .unwrap();

        assert!(store.mark_running(id).await.unwrap());
        let job = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.error.is_none() && job.result.is_none() && job.finished_at.is_none());
    }

    #[tokio::test]
    async fn test_guarded_running_requires_queued() {
        let store = MemoryJobStore::new();
        let id = queued(&store).await;
        assert!(store.mark_running_if_queued(id).await.unwrap());
        assert!(!store.mark_running_if_queued(id).await.unwrap());
        assert!(!store.mark_running_if_queued(JobId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_overwritten() {
        let store = MemoryJobStore::new();
        let id = queued(&store).await;
        store.mark_running(id).await.unwrap();
        store
            .mark_failed(id, &JobError::timeout(60))
            .await
            .unwrap();

        assert!(!store.mark_succeeded(id, &json!({ "ok": true })).await.unwrap());
        let job = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_bulk_passes_match_on_status_and_cutoff() {
        let store = MemoryJobStore::new();
        let stuck = queued(&store).await;
        let waiting = queued(&store).await;
        store.mark_running(stuck).await.unwrap();

        let later = Utc::now() + Duration::hours(1);
        let timed_out = store
            .fail_stale_running(later, &JobError::timeout(1800))
            .await
            .unwrap();
        assert_eq!(timed_out, vec![stuck]);

        let again = store
            .fail_stale_running(later, &JobError::timeout(1800))
            .await
            .unwrap();
        assert!(again.is_empty());

        let expired = store
            .expire_stale_queued(later, &JobError::expired(60))
            .await
            .unwrap();
        assert_eq!(expired, vec![waiting]);

        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.failed, 2);

        let purged = store
            .purge_finished(Utc::now() + Duration::days(8))
            .await
            .unwrap();
        assert_eq!(purged, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_conditional_writes_follow_lifecycle() {
        let store = MemoryJobStore::new();
        for from in JobStatus::ALL {
            let seed = |status| {
                let mut job = Job::queued(&NewJob::new("echo", json!({})), Utc::now());
                job.status = status;
                job
            };

            let job = seed(from);
            let id = job.job_id;
            store.put(job).await;
            assert_eq!(
                store.mark_running_if_queued(id).await.unwrap(),
                from.can_transition_to(JobStatus::Running),
                "RUNNING from {from}"
            );

            let job = seed(from);
            let id = job.job_id;
            store.put(job).await;
            assert_eq!(
                store.mark_succeeded(id, &json!({ "ok": true })).await.unwrap(),
                from.can_transition_to(JobStatus::Succeeded),
                "SUCCEEDED from {from}"
            );

            let job = seed(from);
            let id = job.job_id;
            store.put(job).await;
            assert_eq!(
                store
                    .mark_failed(id, &JobError::new(FailureReason::RunnerError, "boom"))
                    .await
                    .unwrap(),
                from.can_transition_to(JobStatus::Failed),
                "FAILED from {from}"
            );
        }
    }
}
