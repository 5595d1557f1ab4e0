//! Workload kind adapters.
//!
//! Every supported kind gets one adapter implementing [`WorkloadAdapter`].
//! The shared suspend/resume protocol lives in the trait's provided methods:
//!
//! - suspend: write the saved-scale annotation, then patch replicas to 0,
//!   then publish a `Suspended` event. If the annotation write fails the
//!   scale patch is never attempted.
//! - resume: patch replicas back to the saved value, then remove the
//!   annotation, then publish a `Resumed` event.
//!
//! A workload at zero replicas without the annotation was scaled down by its
//! owner and is never resumed.

pub mod deployment;
pub mod registry;
pub mod statefulset;


pub use deployment::DeploymentAdapter;
pub use registry::WorkloadRegistry;
pub use statefulset::StatefulSetAdapter;

use crate::error::ControllerError;
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use tracing::{debug, info, warn};
use workload_client::{Workload, WorkloadClientTrait, WorkloadKind};

/// Annotation holding the replica count to restore.
pub const SAVED_SCALE_ANNOTATION: &str = "tarnfui.io/original-state";

/// Event reason published after a suspend.
pub const REASON_SUSPENDED: &str = "Suspended";

/// Event reason published after a resume.
pub const REASON_RESUMED: &str = "Resumed";

/// Per-pass view of one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedResource {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub current_scale: u32,
    pub saved_scale: Option<u32>,
    raw: Workload,
}

impl ManagedResource {
    pub fn from_workload(workload: Workload) -> Self {
        let saved_scale = parse_saved_scale(workload.annotation(SAVED_SCALE_ANNOTATION));
        Self {
            kind: workload.kind,
            namespace: workload.namespace.clone(),
            name: workload.name.clone(),
            current_scale: u32::try_from(workload.replicas).unwrap_or(0),
            saved_scale,
            raw: workload,
        }
    }

    /// Raw annotation value, if any (well-formed or not).
    pub fn marker(&self) -> Option<&str> {
        self.raw.annotation(SAVED_SCALE_ANNOTATION)
    }

    pub fn workload(&self) -> &Workload {
        &self.raw
    }
}

impl fmt::Display for ManagedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Parses a saved-scale marker.
///
/// Only a decimal in `1..=i32::MAX` (a replica count the API could have
/// held) is accepted; anything else is absent.
pub fn parse_saved_scale(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<i32>().ok())
        .filter(|scale| *scale > 0)
        .and_then(|scale| u32::try_from(scale).ok())
}

/// Why a resource was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already at zero replicas
    AlreadySuspended,
    /// Running, nothing to restore
    AlreadyRunning,
    /// At zero replicas without our marker: scaled down by its owner
    NotManaged,
    /// Running although a marker is present: someone scaled it up by hand
    MarkerOnRunning,
}

/// Result of one suspend/resume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Suspended { from: u32 },
    Resumed { to: u32 },
    Skipped(SkipReason),
}

/// Capability contract for one workload kind.
#[async_trait::async_trait]
pub trait WorkloadAdapter: Send + Sync {
    /// Kind handled by this adapter
    fn kind(&self) -> WorkloadKind;

    /// API client used for every call
    fn client(&self) -> &dyn WorkloadClientTrait;

    /// Objects fetched per list call
    fn page_size(&self) -> u32;

    /// Lazily walks every workload of this kind in scope, one page at a time.
    ///
    /// Each call starts a fresh walk. A list error ends the stream after
    /// yielding the error.
    fn list<'a>(&'a self, namespace: Option<&'a str>) -> BoxStream<'a, Result<ManagedResource, ControllerError>> {
        enum Cursor {
            Start,
            Next(String),
            Done,
        }

        let kind = self.kind();
        let client = self.client();
        let limit = self.page_size();

        stream::unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            match client.list_page(kind, namespace, limit, token.as_deref()).await {
                Ok(page) => {
                    let next = page.continue_token.map(Cursor::Next).unwrap_or(Cursor::Done);
                    let items: Vec<Result<ManagedResource, ControllerError>> =
                        page.items.into_iter().map(|w| Ok(ManagedResource::from_workload(w))).collect();
                    Some((stream::iter(items), next))
                }
                Err(e) => Some((stream::iter(vec![Err(ControllerError::from(e))]), Cursor::Done)),
            }
        })
        .flatten()
        .boxed()
    }

    /// Saved scale from the marker; malformed markers count as absent.
    fn get_saved_scale(&self, resource: &ManagedResource) -> Option<u32> {
        if resource.saved_scale.is_none() {
            if let Some(raw) = resource.marker() {
                warn!(%resource, marker = raw, "Ignoring malformed saved-scale annotation");
            }
        }
        resource.saved_scale
    }

    /// Re-reads the resource right before mutating it.
    async fn refresh(&self, resource: &ManagedResource) -> Result<ManagedResource, ControllerError> {
        let workload = self
            .client()
            .get(resource.kind, &resource.namespace, &resource.name)
            .await?;
        Ok(ManagedResource::from_workload(workload))
    }

    /// Scales the resource to zero, saving its current scale first.
    async fn suspend(&self, resource: &ManagedResource) -> Result<Transition, ControllerError> {
        if resource.current_scale == 0 {
            debug!(%resource, "Already suspended");
            return Ok(Transition::Skipped(SkipReason::AlreadySuspended));
        }

        let fresh = self.refresh(resource).await?;
        if fresh.current_scale == 0 {
            debug!(%resource, "Suspended since listed");
            return Ok(Transition::Skipped(SkipReason::AlreadySuspended));
        }

        let replicas = fresh.current_scale;
        let client = self.client();

        // The marker must land before the scale patch so the scale can always be restored
        client
            .patch_annotation(
                fresh.kind,
                &fresh.namespace,
                &fresh.name,
                SAVED_SCALE_ANNOTATION,
                Some(&replicas.to_string()),
            )
            .await?;
        client.patch_scale(fresh.kind, &fresh.namespace, &fresh.name, 0).await?;

        info!(resource = %fresh, replicas, "Suspended");
        publish_event(
            client,
            fresh.workload(),
            REASON_SUSPENDED,
            &format!("Scaled down from {} to 0 replicas outside active hours", replicas),
        )
        .await;

        Ok(Transition::Suspended { from: replicas })
    }

    /// Restores the saved scale and clears the marker.
    async fn resume(&self, resource: &ManagedResource) -> Result<Transition, ControllerError> {
        if self.get_saved_scale(resource).is_none() {
            let reason = if resource.current_scale == 0 {
                SkipReason::NotManaged
            } else {
                SkipReason::AlreadyRunning
            };
            debug!(%resource, ?reason, "Nothing to restore");
            return Ok(Transition::Skipped(reason));
        }
        if resource.current_scale > 0 {
            debug!(%resource, "Running with a saved-scale annotation, leaving alone");
            return Ok(Transition::Skipped(SkipReason::MarkerOnRunning));
        }

        let fresh = self.refresh(resource).await?;
        let Some(saved) = fresh.saved_scale else {
            debug!(%resource, "Marker removed since listed");
            let reason = if fresh.current_scale == 0 {
                SkipReason::NotManaged
            } else {
                SkipReason::AlreadyRunning
            };
            return Ok(Transition::Skipped(reason));
        };
        if fresh.current_scale > 0 {
            return Ok(Transition::Skipped(SkipReason::MarkerOnRunning));
        }

        let client = self.client();
        let replicas = i32::try_from(saved)
            .map_err(|_| ControllerError::Reconciliation(format!("saved scale {} out of range for {}", saved, fresh)))?;

        client.patch_scale(fresh.kind, &fresh.namespace, &fresh.name, replicas).await?;
        if let Err(e) = client
            .patch_annotation(fresh.kind, &fresh.namespace, &fresh.name, SAVED_SCALE_ANNOTATION, None)
            .await
        {
            // Running with a marker is left alone by later passes until it is suspended again
            warn!(resource = %fresh, replicas = saved, "Restored but saved-scale annotation is stale: {}", e);
            return Err(ControllerError::Reconciliation(format!(
                "{} restored to {} replicas but its saved-scale annotation could not be removed: {}",
                fresh, saved, e
            )));
        }

        info!(resource = %fresh, replicas = saved, "Resumed");
        publish_event(
            client,
            fresh.workload(),
            REASON_RESUMED,
            &format!("Restored to {} replicas for active hours", saved),
        )
        .await;

        Ok(Transition::Resumed { to: saved })
    }
}

/// Events are best effort: failures are logged, never returned.
async fn publish_event(client: &dyn WorkloadClientTrait, workload: &Workload, reason: &str, message: &str) {
    if let Err(e) = client.emit_event(workload, reason, message).await {
        warn!(%workload, reason, "Failed to publish event: {}", e);
    }
}
