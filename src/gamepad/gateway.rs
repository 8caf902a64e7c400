//! Controller Gateway - the seam between the session and the device driver

use super::DeviceError;

/// Snapshot of a single connected controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Driver-side identifier, only meaningful until the next disconnect
    pub slot: usize,
    pub name: String,
    /// Whether the device exposes force feedback
    pub rumble: bool,
}

/// Ordered list of connected controllers as of the last refresh
///
/// Position decides which device is "controller 1" and which is
/// "controller 2". There is no identity guarantee across reconnects: a pad
/// that drops out and comes back may land at a different index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSet {
    controllers: Vec<ControllerInfo>,
}

impl ControllerSet {
    pub fn new(controllers: Vec<ControllerInfo>) -> Self {
        Self { controllers }
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ControllerInfo> {
        self.controllers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControllerInfo> {
        self.controllers.iter()
    }

    /// Checks that the first `needed` controllers can rumble
    ///
    /// Fails fast on the first device lacking force feedback, or on a missing
    /// device, so a session never starts against a pad it cannot drive.
    pub fn require_rumble(&self, needed: usize) -> Result<(), DeviceError> {
        for index in 0..needed {
            match self.controllers.get(index) {
                Some(info) if info.rumble => {}
                Some(info) => {
                    return Err(DeviceError::RumbleUnsupported {
                        index,
                        name: info.name.clone(),
                    })
                }
                None => {
                    return Err(DeviceError::NoController {
                        index,
                        connected: self.len(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Access to connected controllers and their rumble motors
///
/// Implementations must not block: `refresh` is called every poll tick and
/// `rumble` is fire-and-forget, the effect runs out on the device itself.
pub trait ControllerGateway: Send {
    /// Pumps pending driver events so the controller list is current
    fn refresh(&mut self) -> Result<(), DeviceError>;

    /// Number of controllers connected as of the last refresh
    fn count(&self) -> usize {
        self.controllers().len()
    }

    /// Ordered snapshot of connected controllers
    fn controllers(&self) -> ControllerSet;

    /// Plays one pulse on the controller at `index`
    ///
    /// `left` and `right` drive the strong and weak motors, both in `(0, 1)`.
    fn rumble(
        &mut self,
        index: usize,
        left: f32,
        right: f32,
        duration_ms: u32,
    ) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(slot: usize, rumble: bool) -> ControllerInfo {
        ControllerInfo {
            slot,
            name: format!("Pad {slot}"),
            rumble,
        }
    }

    #[test]
    fn require_rumble_accepts_capable_pads() {
        let set = ControllerSet::new(vec![pad(0, true), pad(1, true)]);
        assert_eq!(set.require_rumble(2), Ok(()));
    }

    #[test]
    fn require_rumble_names_first_incapable_pad() {
        let set = ControllerSet::new(vec![pad(0, true), pad(3, false)]);
        assert_eq!(
            set.require_rumble(2),
            Err(DeviceError::RumbleUnsupported {
                index: 1,
                name: "Pad 3".to_string()
            })
        );
    }

    #[test]
    fn require_rumble_reports_missing_pad() {
        let set = ControllerSet::new(vec![pad(0, true)]);
        assert_eq!(
            set.require_rumble(2),
            Err(DeviceError::NoController {
                index: 1,
                connected: 1
            })
        );
    }
}
