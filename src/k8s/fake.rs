//! In-memory stand-in for `KubernetesAdapter`, used by worker and API
//! boundary tests (P4, P5, scenario 5) without a live cluster. Same seam
//! the teacher exercises via mock kernels in `kernel::recovery`'s tests,
//! but expressed as a full fake rather than a mock since the adapter's
//! stateful read-after-write (`status()` reflecting a prior `scale()`) is
//! exactly the behavior under test.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::k8s::{K8sStatus, KubernetesAdapter, PodInfo};
use crate::types::{Error, ExecutionId, Result};

/// Configurable fake backing the worker/gate tests.
#[derive(Debug)]
pub struct FakeAdapter {
    replicas: AtomicI32,
    /// When set, `status()` reports this value instead of `replicas` —
    /// simulates scenario 5's verification mismatch.
    status_override: AtomicI32,
    has_override: AtomicBool,
    fail_scale: AtomicBool,
    fail_restart: AtomicBool,
    fail_status: AtomicBool,
    restart_calls: StdMutex<Vec<String>>,
    /// Injected latency before `scale()` applies its effect — lets tests
    /// hold the worker mid-mutation (scenario 6's "while scale(3) is in
    /// flight").
    scale_delay: StdMutex<Option<Duration>>,
}

impl FakeAdapter {
    pub fn new(initial_replicas: i32) -> Self {
        Self {
            replicas: AtomicI32::new(initial_replicas),
            status_override: AtomicI32::new(0),
            has_override: AtomicBool::new(false),
            fail_scale: AtomicBool::new(false),
            fail_restart: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
            restart_calls: StdMutex::new(Vec::new()),
            scale_delay: StdMutex::new(None),
        }
    }

    /// Makes `scale()` sleep for `delay` before applying its effect.
    pub fn set_scale_delay(&self, delay: Duration) {
        *self.scale_delay.lock().expect("scale_delay poisoned") = Some(delay);
    }

    /// A fake whose every mutating call fails — for P4 (no leak on
    /// failure) and error-path tests.
    pub fn failing() -> Self {
        let fake = Self::new(1);
        fake.fail_scale.store(true, Ordering::SeqCst);
        fake.fail_restart.store(true, Ordering::SeqCst);
        fake
    }

    /// Forces `status()` to report `replicas` regardless of what `scale()`
    /// was asked to set — reproduces scenario 5's "accepted but diverged"
    /// verification mismatch.
    pub fn set_status_override(&self, replicas: i32) {
        self.status_override.store(replicas, Ordering::SeqCst);
        self.has_override.store(true, Ordering::SeqCst);
    }

    pub fn current_replicas(&self) -> i32 {
        self.replicas.load(Ordering::SeqCst)
    }

    pub fn restart_call_count(&self) -> usize {
        self.restart_calls.lock().expect("restart_calls poisoned").len()
    }
}

#[async_trait]
impl KubernetesAdapter for FakeAdapter {
    async fn scale(&self, replicas: u32, _execution_id: &ExecutionId) -> Result<()> {
        let delay = *self.scale_delay.lock().expect("scale_delay poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_scale.load(Ordering::SeqCst) {
            return Err(Error::kubernetes("fake adapter: scale injected failure"));
        }
        self.replicas.store(replicas as i32, Ordering::SeqCst);
        Ok(())
    }

    async fn restart(&self, execution_id: &ExecutionId) -> Result<()> {
        if self.fail_restart.load(Ordering::SeqCst) {
            return Err(Error::kubernetes("fake adapter: restart injected failure"));
        }
        self.restart_calls
            .lock()
            .expect("restart_calls poisoned")
            .push(execution_id.to_string());
        Ok(())
    }

    async fn status(&self, _execution_id: &ExecutionId) -> Result<K8sStatus> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(Error::kubernetes("fake adapter: status injected failure"));
        }
        let replicas = if self.has_override.load(Ordering::SeqCst) {
            self.status_override.load(Ordering::SeqCst)
        } else {
            self.replicas.load(Ordering::SeqCst)
        };
        Ok(K8sStatus {
            replicas,
            ready_replicas: replicas,
            pods: (0..replicas.max(0))
                .map(|i| PodInfo {
                    name: format!("fake-pod-{i}"),
                    start_time: None,
                })
                .collect(),
        })
    }
}
