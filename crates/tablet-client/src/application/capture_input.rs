//! Translates raw surface samples into normalized input events.
//!
//! The UI reports pointer samples in surface pixels, with pressure as a
//! float (`1.0` is a "normal" press, some devices report up to `2.0`) and
//! orientation in radians.  [`PointerTranslator`] turns each sample into the
//! events the host expects:
//!
//! | Sample        | Events                                                    |
//! |---------------|-----------------------------------------------------------|
//! | `HoverEnter`  | position, proximity press                                 |
//! | `HoverMove`   | position                                                  |
//! | `HoverExit`   | position, proximity release                               |
//! | `Down`        | position, (proximity press if out of range), tip press     |
//! | `Move`        | position                                                  |
//! | `Up`/`Cancel` | position, tip release, (proximity release if it was faked) |
//!
//! Devices without hover support (fingers, most passive pens) never send
//! `HoverEnter`.  The host's drivers still expect the tool to be "in range"
//! before it touches, so a `Down` while out of range fakes proximity and the
//! matching `Up` ends it again.

use tablet_core::{
    ButtonEvent, DeviceChange, Event, PointerUpdate, ToolState, PROXIMITY_BUTTON, TIP_BUTTON,
};
use tracing::{debug, trace};

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    HoverEnter,
    HoverMove,
    HoverExit,
    Down,
    Move,
    Up,
    Cancel,
}

/// One raw sample from the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub action: PointerAction,
    /// Surface pixels from the left edge.
    pub x: f32,
    /// Surface pixels from the top edge.
    pub y: f32,
    /// `0.0..=2.0`; values outside are clamped.
    pub pressure: f32,
    /// Radians, `-π..=π`.
    pub orientation: f32,
    pub tool: ToolState,
    pub device_id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Proximity {
    OutOfRange,
    InRange,
    /// In range only because the tool touched down without hovering first.
    FakeInRange,
}

/// Stateful sample-to-event translator for one drawing surface.
#[derive(Debug)]
pub struct PointerTranslator {
    width: f32,
    height: f32,
    stylus_only: bool,
    proximity: Proximity,
}

impl PointerTranslator {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            stylus_only: false,
            proximity: Proximity::OutOfRange,
        }
    }

    /// Called when the surface is resized.
    pub fn set_surface_size(&mut self, width: f32, height: f32) {
        debug!(
            "surface resized: {}x{} (before: {}x{})",
            width, height, self.width, self.height
        );
        self.width = width;
        self.height = height;
    }

    /// When set, finger touches are ignored and only stylus and eraser
    /// samples are translated.
    pub fn set_stylus_only(&mut self, stylus_only: bool) {
        self.stylus_only = stylus_only;
    }

    /// Translates one sample.  Returns no events for filtered samples.
    pub fn translate(&mut self, sample: &PointerSample) -> Vec<Event> {
        if self.stylus_only && sample.tool == ToolState::Touch {
            trace!("ignoring touch sample (stylus only)");
            return Vec::new();
        }

        let position = Event::PointerUpdate(PointerUpdate {
            x: normalize_axis(sample.x, self.width),
            y: normalize_axis(sample.y, self.height),
            pressure: normalize_pressure(sample.pressure),
            orientation: normalize_orientation(sample.orientation),
            tool: sample.tool,
            device_id: sample.device_id,
        });
        let button = |button_id, pressed| {
            Event::Button(ButtonEvent {
                button_id,
                pressed,
                device_id: sample.device_id,
            })
        };

        let mut events = vec![position];
        match sample.action {
            PointerAction::HoverMove | PointerAction::Move => {}
            PointerAction::HoverEnter => {
                self.proximity = Proximity::InRange;
                events.push(button(PROXIMITY_BUTTON, true));
            }
            PointerAction::HoverExit => {
                self.proximity = Proximity::OutOfRange;
                events.push(button(PROXIMITY_BUTTON, false));
            }
            PointerAction::Down => {
                if self.proximity == Proximity::OutOfRange {
                    self.proximity = Proximity::FakeInRange;
                    events.push(button(PROXIMITY_BUTTON, true));
                }
                events.push(button(TIP_BUTTON, true));
            }
            PointerAction::Up | PointerAction::Cancel => {
                events.push(button(TIP_BUTTON, false));
                if self.proximity == Proximity::FakeInRange {
                    self.proximity = Proximity::OutOfRange;
                    events.push(button(PROXIMITY_BUTTON, false));
                }
            }
        }
        trace!("{:?} -> {} events", sample.action, events.len());
        events
    }

    /// A device became available.
    pub fn attach_device(&self, device_id: u8) -> Event {
        Event::DeviceChange(DeviceChange {
            device_id,
            present: true,
        })
    }

    /// A device went away.
    pub fn detach_device(&self, device_id: u8) -> Event {
        Event::DeviceChange(DeviceChange {
            device_id,
            present: false,
        })
    }
}

fn normalize_axis(value: f32, size: f32) -> u16 {
    if size <= 0.0 {
        return 0;
    }
    // NaN casts to 0.
    (value.clamp(0.0, size) / size * f32::from(u16::MAX)) as u16
}

fn normalize_pressure(pressure: f32) -> u16 {
    (pressure.clamp(0.0, 2.0) * (f32::from(u16::MAX) / 2.0)) as u16
}

fn normalize_orientation(radians: f32) -> i16 {
    use std::f32::consts::PI;
    (radians.clamp(-PI, PI) / PI * f32::from(i16::MAX)) as i16
}

// ── Tests ─────────────────────────────────────────────────────────────────────
