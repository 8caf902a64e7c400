//! Virtual controllers for running without hardware
//!
//! The gateway half is handed to the session, the [`VirtualPads`] half stays
//! with whoever wants to plug pads in and out or inspect the pulses that were
//! played. Both share the same state behind a mutex.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info};

use super::{ControllerGateway, ControllerInfo, ControllerSet, DeviceError};

/// A pulse as seen by a virtual controller
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPulse {
    pub index: usize,
    pub slot: usize,
    pub left: f32,
    pub right: f32,
    pub duration_ms: u32,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct PadState {
    plugged: Vec<ControllerInfo>,
    pulses: Vec<RecordedPulse>,
    failing_refreshes: usize,
    next_slot: usize,
}

/// Control side of the virtual controllers
#[derive(Debug, Clone, Default)]
pub struct VirtualPads {
    state: Arc<Mutex<PadState>>,
}

impl VirtualPads {
    fn lock(&self) -> MutexGuard<'_, PadState> {
        // A panic while holding the lock leaves plain data behind, keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Plugs in a new controller at the end of the list
    pub fn connect(&self, rumble: bool) -> usize {
        let mut state = self.lock();
        let slot = state.next_slot;
        state.next_slot += 1;
        state.plugged.push(ControllerInfo {
            slot,
            name: format!("Virtual Pad {slot}"),
            rumble,
        });
        info!("Virtual controller {} connected", slot);
        slot
    }

    /// Unplugs the controller currently at `index`
    pub fn disconnect(&self, index: usize) -> Option<ControllerInfo> {
        let mut state = self.lock();
        if index < state.plugged.len() {
            let pad = state.plugged.remove(index);
            info!("Virtual controller {} disconnected", pad.slot);
            Some(pad)
        } else {
            None
        }
    }

    /// Makes the next `count` refreshes fail
    pub fn fail_refreshes(&self, count: usize) {
        self.lock().failing_refreshes = count;
    }

    pub fn pulses(&self) -> Vec<RecordedPulse> {
        self.lock().pulses.clone()
    }

    pub fn clear_pulses(&self) {
        self.lock().pulses.clear();
    }
}

/// Gateway half of the virtual controllers
///
/// Like a real driver, the connected list only changes on `refresh`.
#[derive(Debug)]
pub struct VirtualGateway {
    pads: VirtualPads,
    visible: Vec<ControllerInfo>,
}

impl VirtualGateway {
    /// Creates a gateway with `controllers` rumble-capable pads plugged in
    pub fn new(controllers: usize) -> (Self, VirtualPads) {
        let pads = VirtualPads::default();
        for _ in 0..controllers {
            pads.connect(true);
        }
        let visible = pads.lock().plugged.clone();
        let gateway = Self {
            pads: pads.clone(),
            visible,
        };
        (gateway, pads)
    }
}

impl ControllerGateway for VirtualGateway {
    fn refresh(&mut self) -> Result<(), DeviceError> {
        let mut state = self.pads.lock();
        if state.failing_refreshes > 0 {
            state.failing_refreshes -= 1;
            return Err(DeviceError::RefreshError(
                "virtual refresh failure".to_string(),
            ));
        }
        self.visible = state.plugged.clone();
        Ok(())
    }

    fn controllers(&self) -> ControllerSet {
        ControllerSet::new(self.visible.clone())
    }

    fn rumble(
        &mut self,
        index: usize,
        left: f32,
        right: f32,
        duration_ms: u32,
    ) -> Result<(), DeviceError> {
        let pad = self.visible.get(index).ok_or(DeviceError::NoController {
            index,
            connected: self.visible.len(),
        })?;
        if !pad.rumble {
            return Err(DeviceError::RumbleUnsupported {
                index,
                name: pad.name.clone(),
            });
        }

        debug!(
            "Virtual rumble on controller {} ({}): {:.2}/{:.2} for {}ms",
            index, pad.slot, left, right, duration_ms
        );
        let pulse = RecordedPulse {
            index,
            slot: pad.slot,
            left,
            right,
            duration_ms,
            at: Instant::now(),
        };
        self.pads.lock().pulses.push(pulse);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_list_changes_only_on_refresh() {
        let (mut gateway, pads) = VirtualGateway::new(1);
        pads.connect(true);
        assert_eq!(gateway.count(), 1);

        gateway.refresh().unwrap();
        assert_eq!(gateway.count(), 2);

        pads.disconnect(0);
        assert_eq!(gateway.count(), 2);
        gateway.refresh().unwrap();
        assert_eq!(gateway.count(), 1);
        assert_eq!(gateway.controllers().get(0).unwrap().slot, 1);
    }

    #[test]
    fn failing_refresh_keeps_previous_list() {
        let (mut gateway, pads) = VirtualGateway::new(2);
        pads.disconnect(1);
        pads.fail_refreshes(1);

        assert!(matches!(
            gateway.refresh(),
            Err(DeviceError::RefreshError(_))
        ));
        assert_eq!(gateway.count(), 2);

        gateway.refresh().unwrap();
        assert_eq!(gateway.count(), 1);
    }

    #[tokio::test]
    async fn rumble_is_recorded_per_index() {
        let (mut gateway, pads) = VirtualGateway::new(2);
        gateway.rumble(1, 0.4, 0.4, 250).unwrap();

        let pulses = pads.pulses();
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].index, 1);
        assert_eq!(pulses[0].duration_ms, 250);
    }

    #[test]
    fn rumble_rejects_missing_and_incapable_pads() {
        let (mut gateway, pads) = VirtualGateway::new(1);
        pads.connect(false);
        gateway.refresh().unwrap();

        assert_eq!(
            gateway.rumble(1, 0.5, 0.5, 100),
            Err(DeviceError::RumbleUnsupported {
                index: 1,
                name: "Virtual Pad 1".to_string()
            })
        );
        assert_eq!(
            gateway.rumble(2, 0.5, 0.5, 100),
            Err(DeviceError::NoController {
                index: 2,
                connected: 2
            })
        );
    }
}
