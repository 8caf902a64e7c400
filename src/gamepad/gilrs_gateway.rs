use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Repeat, Replay, Ticks};
use gilrs::{Event, EventType, GamepadId, Gilrs};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{ControllerGateway, ControllerInfo, ControllerSet, DeviceError};

/// Hardware gateway backed by gilrs force feedback
///
/// Effects stop as soon as their handle is dropped, so every started pulse
/// is parked in `playing` until its play time has run out.
pub struct GilrsGateway {
    gilrs: Gilrs,
    connected: Vec<GamepadId>,
    playing: Vec<(Instant, Effect)>,
}

impl GilrsGateway {
    pub fn create() -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::InitializationError(e.to_string()));
            }
        };

        let mut gateway = Self {
            gilrs,
            connected: Vec::new(),
            playing: Vec::new(),
        };
        gateway.sync_connected();

        let controllers = gateway.controllers();
        if controllers.is_empty() {
            warn!("No gamepad connected, waiting for controllers");
        } else {
            info!("Found {} gamepads:", controllers.len());
            for (idx, pad) in controllers.iter().enumerate() {
                info!(
                    "  [{}] ID: {}, Name: {}, Rumble: {}",
                    idx, pad.slot, pad.name, pad.rumble
                );
            }
        }

        Ok(gateway)
    }

    fn sync_connected(&mut self) {
        self.connected = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, _)| id)
            .collect();
    }

    fn prune_finished(&mut self) {
        let now = Instant::now();
        let before = self.playing.len();
        self.playing.retain(|(until, _)| *until > now);
        let dropped = before - self.playing.len();
        if dropped > 0 {
            debug!("Released {} finished rumble effects", dropped);
        }
    }
}

impl ControllerGateway for GilrsGateway {
    fn refresh(&mut self) -> Result<(), DeviceError> {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    info!("Controller connected: {}", id);
                }
                EventType::Disconnected => {
                    warn!("Controller disconnected: {}", id);
                }
                _ => {}
            }
        }

        self.sync_connected();
        self.prune_finished();
        Ok(())
    }

    fn count(&self) -> usize {
        self.connected.len()
    }

    fn controllers(&self) -> ControllerSet {
        ControllerSet::new(
            self.connected
                .iter()
                .map(|&id| {
                    let gamepad = self.gilrs.gamepad(id);
                    ControllerInfo {
                        slot: usize::from(id),
                        name: gamepad.name().to_string(),
                        rumble: gamepad.is_ff_supported(),
                    }
                })
                .collect(),
        )
    }

    fn rumble(
        &mut self,
        index: usize,
        left: f32,
        right: f32,
        duration_ms: u32,
    ) -> Result<(), DeviceError> {
        let id = *self
            .connected
            .get(index)
            .ok_or(DeviceError::NoController {
                index,
                connected: self.connected.len(),
            })?;

        let gamepad = self.gilrs.gamepad(id);
        if !gamepad.is_ff_supported() {
            return Err(DeviceError::RumbleUnsupported {
                index,
                name: gamepad.name().to_string(),
            });
        }

        let play_for = Ticks::from_ms(duration_ms);
        let scheduling = Replay {
            play_for,
            ..Default::default()
        };

        let effect = EffectBuilder::new()
            .add_effect(BaseEffect {
                kind: BaseEffectType::Strong {
                    magnitude: magnitude(left),
                },
                scheduling,
                envelope: Default::default(),
            })
            .add_effect(BaseEffect {
                kind: BaseEffectType::Weak {
                    magnitude: magnitude(right),
                },
                scheduling,
                envelope: Default::default(),
            })
            .repeat(Repeat::For(play_for))
            .gamepads(&[id])
            .finish(&mut self.gilrs)
            .map_err(|e| DeviceError::RumbleFailed {
                index,
                reason: e.to_string(),
            })?;

        effect.play().map_err(|e| DeviceError::RumbleFailed {
            index,
            reason: e.to_string(),
        })?;

        debug!(
            "Rumble on controller {} ({}): left={:.2} right={:.2} for {}ms",
            index, id, left, right, duration_ms
        );
        self.playing.push((
            Instant::now() + Duration::from_millis(u64::from(duration_ms)),
            effect,
        ));
        Ok(())
    }
}

// Maps a motor strength in 0.0-1.0 onto the gilrs magnitude range
fn magnitude(strength: f32) -> u16 {
    (strength.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
}
