//! Production `KubernetesAdapter` backed by `kube-rs`.
//!
//! Patch shapes are grounded on the orka operator's scale/restart logic
//! (the scale path generalized here to the literal JSON-Patch `replace`
//! operation §6.2 specifies, the restart path to a strategic-merge patch);
//! client construction (`Client::try_default`, in-cluster-or-kubeconfig) is
//! grounded on the A3Mailer kubernetes-operator crate; label-selector pod
//! listing is grounded on the kubefuzz crate's `k8s-resources` module —
//! see DESIGN.md for exact paths.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;

use crate::k8s::{K8sStatus, KubernetesAdapter, PodInfo};
use crate::types::{Error, ExecutionId, KubernetesConfig, Result};

#[derive(Debug)]
pub struct KubeClientAdapter {
    client: Client,
    namespace: String,
    deployment: String,
    replica_floor: u32,
    replica_ceiling: u32,
    timeout: Duration,
}

impl KubeClientAdapter {
    /// Connects using the in-cluster service account when available,
    /// falling back to the local kubeconfig (§6.2).
    pub async fn connect(config: &KubernetesConfig) -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::kubernetes_with_source("failed to construct kube client", e))?;
        Ok(Self {
            client,
            namespace: config.namespace.clone(),
            deployment: config.deployment.clone(),
            replica_floor: config.replica_floor,
            replica_ceiling: config.replica_ceiling,
            timeout: config.adapter_timeout,
        })
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn with_timeout<T>(&self, fut: impl std::future::Future<Output = kube::Result<T>>, op: &str, execution_id: &ExecutionId) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::kubernetes_with_source(
                format!("{op} failed for execution {execution_id}"),
                e,
            )),
            Err(_) => Err(Error::timeout(format!(
                "{op} timed out after {:?} for execution {execution_id}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl KubernetesAdapter for KubeClientAdapter {
    async fn scale(&self, replicas: u32, execution_id: &ExecutionId) -> Result<()> {
        if replicas < self.replica_floor || replicas > self.replica_ceiling {
            return Err(Error::validation(format!(
                "replicas {replicas} outside [{}, {}]",
                self.replica_floor, self.replica_ceiling
            )));
        }

        // Literal JSON-Patch replace op per §6.2's wire contract, not a
        // merge patch — the spec pins the exact operation shape.
        let patch: json_patch::Patch = serde_json::from_value(json!([
            { "op": "replace", "path": "/spec/replicas", "value": replicas }
        ]))
        .map_err(|e| Error::system(format!("failed to build scale patch: {e}")))?;
        let api = self.deployments();
        self.with_timeout(
            // `Json`'s payload is a `json_patch::Patch`, not a `T`, so the
            // variant's unused type parameter is pinned to `()` — the
            // established kube-rs idiom for this variant.
            api.patch(&self.deployment, &PatchParams::default(), &Patch::Json::<()>(patch)),
            "scale",
            execution_id,
        )
        .await?;
        Ok(())
    }

    async fn restart(&self, execution_id: &ExecutionId) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        // Strategic-merge patch per §6.2, not a plain JSON merge patch.
        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            "kubectl.kubernetes.io/restartedAt": now
                        }
                    }
                }
            }
        });
        let api = self.deployments();
        self.with_timeout(
            api.patch(&self.deployment, &PatchParams::default(), &Patch::Strategic(&patch)),
            "restart",
            execution_id,
        )
        .await?;
        Ok(())
    }

    async fn status(&self, execution_id: &ExecutionId) -> Result<K8sStatus> {
        let dep_api = self.deployments();
        let pod_api = self.pods();
        let dep = self
            .with_timeout(dep_api.get(&self.deployment), "status(deployment)", execution_id)
            .await?;

        let label_selector = format!("app={}", self.deployment);
        let list_params = ListParams::default().labels(&label_selector);
        let pod_list = self
            .with_timeout(pod_api.list(&list_params), "status(pods)", execution_id)
            .await?;

        let replicas = dep.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let ready_replicas = dep
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);

        let pods = pod_list
            .items
            .into_iter()
            .map(|pod| PodInfo {
                name: pod.metadata.name.unwrap_or_default(),
                start_time: pod.status.and_then(|s| s.start_time).map(|t| t.0),
            })
            .collect();

        Ok(K8sStatus {
            replicas,
            ready_replicas,
            pods,
        })
    }
}
