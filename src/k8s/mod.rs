//! The Kubernetes execution adapter (§4.5) — the sole mutating path (I5).

mod adapter;
mod fake;
mod kube_adapter;

pub use adapter::{K8sStatus, KubernetesAdapter, PodInfo};
#[cfg(test)]
pub use adapter::MockKubernetesAdapter;
pub use fake::FakeAdapter;
pub use kube_adapter::KubeClientAdapter;
