use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::device::{DeviceDescriptor, DeviceKind, DeviceSelection};
use crate::models::error::ReadinessError;
use crate::traits::media_devices::{CaptureConstraints, MediaDevices};

/// Fill empty selection slots with the first device of each kind.
///
/// An existing selection is never overwritten, even when the device it
/// names is missing from `devices`.
pub fn auto_select(selection: &mut DeviceSelection, devices: &[DeviceDescriptor]) {
    for kind in DeviceKind::ALL {
        if selection.get(kind).is_some() {
            continue;
        }
        if let Some(first) = devices.iter().find(|d| d.kind == kind) {
            selection.set(kind, Some(first.id.clone()));
        }
    }
}

struct CatalogState {
    devices: Vec<DeviceDescriptor>,
    selection: DeviceSelection,
}

/// Device catalog resolver.
///
/// Keeps the latest enumeration and the user's per-kind selection.
/// Enumeration failures degrade to an empty list so the candidate can still
/// attempt the test.
pub struct DeviceCatalog {
    host: Arc<dyn MediaDevices>,
    state: Mutex<CatalogState>,
}

impl DeviceCatalog {
    pub fn new(host: Arc<dyn MediaDevices>) -> Self {
        Self {
            host,
            state: Mutex::new(CatalogState {
                devices: Vec::new(),
                selection: DeviceSelection::default(),
            }),
        }
    }

    /// Enumerate devices and apply the auto-selection policy.
    pub async fn enumerate(&self) -> Vec<DeviceDescriptor> {
        let devices = match self.host.enumerate().await {
            Ok(devices) => devices,
            Err(e) => {
                let err = match e {
                    ReadinessError::EnumerationFailed(_) => e,
                    other => ReadinessError::EnumerationFailed(other.to_string()),
                };
                log::warn!("{}; continuing with an empty device list", err);
                Vec::new()
            }
        };

        let mut state = self.state.lock();
        auto_select(&mut state.selection, &devices);
        state.devices = devices.clone();
        log::debug!(
            "Enumerated {} devices (selection: {:?})",
            devices.len(),
            state.selection
        );
        devices
    }

    /// Briefly open a combined audio+video capture to unlock device labels,
    /// release it, then enumerate again.
    ///
    /// Denial is not an error: the catalog falls back to unlabeled devices.
    pub async fn refresh_with_permission(&self) -> Vec<DeviceDescriptor> {
        match self.host.open(&CaptureConstraints::combined()).await {
            Ok(stream) => stream.stop_all(),
            Err(e) => log::info!("Label unlock capture refused ({}); keeping unlabeled devices", e),
        }
        self.enumerate().await
    }

    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.state.lock().devices.clone()
    }

    pub fn devices_of(&self, kind: DeviceKind) -> Vec<DeviceDescriptor> {
        self.state
            .lock()
            .devices
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn selection(&self) -> DeviceSelection {
        self.state.lock().selection.clone()
    }

    /// Record an explicit user choice. The id must be in the current list.
    pub fn select(&self, kind: DeviceKind, id: &str) -> Result<(), ReadinessError> {
        let mut state = self.state.lock();
        if !state.devices.iter().any(|d| d.kind == kind && d.id == id) {
            return Err(ReadinessError::DeviceNotFound);
        }
        state.selection.set(kind, Some(id.to_string()));
        log::info!("Selected {} {}", kind, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Behavior, FakeDevices};

    fn listed(ids: &[(&str, DeviceKind)]) -> Vec<DeviceDescriptor> {
        ids.iter()
            .map(|(id, kind)| DeviceDescriptor::new(*id, "", *kind))
            .collect()
    }

    #[test]
    fn auto_select_picks_first_of_each_kind() {
        let devices = listed(&[
            ("mic-1", DeviceKind::Microphone),
            ("cam-1", DeviceKind::Camera),
            ("cam-2", DeviceKind::Camera),
            ("mic-2", DeviceKind::Microphone),
        ]);
        let mut selection = DeviceSelection::default();
        auto_select(&mut selection, &devices);

        assert_eq!(selection.get(DeviceKind::Camera), Some("cam-1"));
        assert_eq!(selection.get(DeviceKind::Microphone), Some("mic-1"));
        assert_eq!(selection.get(DeviceKind::Speaker), None);
    }

    #[test]
    fn auto_select_never_overwrites() {
        for n in 1..5 {
            let devices: Vec<_> = (0..n)
                .map(|i| DeviceDescriptor::new(format!("cam-{}", i), "", DeviceKind::Camera))
                .collect();

            let mut fresh = DeviceSelection::default();
            auto_select(&mut fresh, &devices);
            assert_eq!(fresh.get(DeviceKind::Camera), Some("cam-0"));

            let mut chosen = DeviceSelection::default();
            chosen.set(DeviceKind::Camera, Some("gone".into()));
            auto_select(&mut chosen, &devices);
            assert_eq!(chosen.get(DeviceKind::Camera), Some("gone"));
        }
    }

    #[test]
    fn auto_select_ignores_empty_lists() {
        let mut selection = DeviceSelection::default();
        auto_select(&mut selection, &[]);
        assert_eq!(selection, DeviceSelection::default());
    }

    #[tokio::test]
    async fn user_selection_survives_reenumeration() {
        let host = Arc::new(FakeDevices::standard());
        let catalog = DeviceCatalog::new(host.clone());
        catalog.enumerate().await;

        catalog.select(DeviceKind::Camera, "cam-2").unwrap();
        catalog.enumerate().await;

        assert_eq!(catalog.selection().get(DeviceKind::Camera), Some("cam-2"));
    }

    #[tokio::test]
    async fn select_rejects_unknown_ids() {
        let catalog = DeviceCatalog::new(Arc::new(FakeDevices::standard()));
        catalog.enumerate().await;

        assert_eq!(
            catalog.select(DeviceKind::Camera, "nope"),
            Err(ReadinessError::DeviceNotFound)
        );
    }

    #[tokio::test]
    async fn labels_appear_after_permission_refresh() {
        let host = Arc::new(FakeDevices::standard());
        let catalog = DeviceCatalog::new(host.clone());

        let before = catalog.enumerate().await;
        assert!(before.iter().all(|d| !d.has_label()));

        let after = catalog.refresh_with_permission().await;
        assert!(after.iter().all(|d| d.has_label()));
        // The unlock capture is released immediately.
        assert_eq!(host.live_tracks(), 0);
    }

    #[tokio::test]
    async fn denied_refresh_falls_back_to_unlabeled_list() {
        let host = Arc::new(FakeDevices::standard());
        host.set_behavior(DeviceKind::Camera, Behavior::Fail(ReadinessError::PermissionDenied));
        let catalog = DeviceCatalog::new(host.clone());

        let devices = catalog.refresh_with_permission().await;

        assert!(!devices.is_empty());
        assert!(devices.iter().all(|d| !d.has_label()));
    }

    #[tokio::test]
    async fn enumeration_failure_degrades_to_empty() {
        let host = Arc::new(FakeDevices::standard());
        host.fail_enumeration(ReadinessError::EnumerationFailed("backend gone".into()));
        let catalog = DeviceCatalog::new(host);

        assert!(catalog.enumerate().await.is_empty());
        assert!(catalog.devices_of(DeviceKind::Camera).is_empty());
    }
}
