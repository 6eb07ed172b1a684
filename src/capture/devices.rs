//! Camera and microphone discovery.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use super::media::{DeviceKind, MediaConstraints, MediaHost};

const LABEL_ID_CHARS: usize = 8;

/// A device the user can pick in the recording setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOption {
    pub device_id: String,
    pub label: String,
}

pub struct DeviceEnumerator {
    host: Arc<dyn MediaHost>,
    unlocked: Mutex<HashSet<DeviceKind>>,
}

impl DeviceEnumerator {
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self {
            host,
            unlocked: Mutex::new(HashSet::new()),
        }
    }

    pub async fn list_video_devices(&self) -> Vec<DeviceOption> {
        self.list(DeviceKind::VideoInput).await
    }

    pub async fn list_audio_devices(&self) -> Vec<DeviceOption> {
        self.list(DeviceKind::AudioInput).await
    }

    /// Never fails: a missing device or a denied permission is an empty list.
    async fn list(&self, kind: DeviceKind) -> Vec<DeviceOption> {
        if !self.is_unlocked(kind) {
            match self.host.get_user_media(&MediaConstraints::probe(kind)).await {
                Ok(stream) => {
                    stream.stop_all();
                    self.unlocked
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(kind);
                    debug!("Permission granted for {}", kind.as_str());
                }
                Err(e) => {
                    warn!("No {} access: {}", kind.as_str(), e);
                    return Vec::new();
                }
            }
        }

        let devices = match self.host.enumerate_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to enumerate {} devices: {}", kind.as_str(), e);
                return Vec::new();
            }
        };

        devices
            .into_iter()
            .filter(|d| d.kind == kind)
            .map(|d| {
                let label = if d.label.trim().is_empty() {
                    fallback_label(kind, &d.device_id)
                } else {
                    d.label
                };
                DeviceOption {
                    device_id: d.device_id,
                    label,
                }
            })
            .collect()
    }

    fn is_unlocked(&self, kind: DeviceKind) -> bool {
        self.unlocked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }
}

fn fallback_label(kind: DeviceKind, device_id: &str) -> String {
    let short: String = device_id.chars().take(LABEL_ID_CHARS).collect();
    match kind {
        DeviceKind::VideoInput => format!("Camera {short}"),
        DeviceKind::AudioInput => format!("Microphone {short}"),
    }
}
