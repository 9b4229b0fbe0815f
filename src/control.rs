// CLASSIFICATION: COMMUNITY
// Filename: control.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Device controls and the value-setting seam.
//!
//! Applying a value to hardware happens outside the engine. The engine hands
//! each SetValue to a [`ControlSetter`], which validates the value and
//! updates the control when it accepts it.

use log::debug;
use thiserror::Error;

/// Longest control name a one-byte record length can carry.
pub const MAX_CONTROL_NAME: usize = 255 - 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlType {
    OnOff = 0,
    Range = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlDirection {
    Input = 0,
    Output = 1,
}

/// One addressable control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub id: u8,
    pub control_type: ControlType,
    pub direction: ControlDirection,
    pub low: u8,
    pub high: u8,
    pub value: u8,
    pub name: String,
}

impl Control {
    /// Control starting at its low bound.
    pub fn new(
        id: u8,
        name: impl Into<String>,
        control_type: ControlType,
        direction: ControlDirection,
        low: u8,
        high: u8,
    ) -> Self {
        Self {
            id,
            control_type,
            direction,
            low,
            high,
            value: low,
            name: name.into(),
        }
    }

    /// Two-state control over `0..=1`.
    pub fn on_off(id: u8, name: impl Into<String>, direction: ControlDirection) -> Self {
        Self::new(id, name, ControlType::OnOff, direction, 0, 1)
    }

    pub fn range(
        id: u8,
        name: impl Into<String>,
        direction: ControlDirection,
        low: u8,
        high: u8,
    ) -> Self {
        Self::new(id, name, ControlType::Range, direction, low, high)
    }

    pub fn contains(&self, value: u32) -> bool {
        (u32::from(self.low)..=u32::from(self.high)).contains(&value)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("control {0} already exists")]
    Duplicate(u8),
    #[error("low bound {low} above high bound {high}")]
    InvalidBounds { low: u8, high: u8 },
    #[error("control name of {0} bytes is too long")]
    NameTooLong(usize),
}

/// Reasons a SetValue is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetValueError {
    #[error("no control with id {0}")]
    UnknownControl(u8),
    #[error("value {value} outside {low}..={high} for control {control}")]
    OutOfRange {
        control: u8,
        value: u32,
        low: u8,
        high: u8,
    },
}

/// Validates and applies a requested value.
pub trait ControlSetter {
    fn set_value(&mut self, control: &mut Control, value: u32) -> Result<(), SetValueError>;
}

impl<F> ControlSetter for F
where
    F: FnMut(&mut Control, u32) -> Result<(), SetValueError>,
{
    fn set_value(&mut self, control: &mut Control, value: u32) -> Result<(), SetValueError> {
        self(control, value)
    }
}

/// Setter that enforces the control's bounds and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundedSetter;

impl ControlSetter for BoundedSetter {
    fn set_value(&mut self, control: &mut Control, value: u32) -> Result<(), SetValueError> {
        if !control.contains(value) {
            return Err(SetValueError::OutOfRange {
                control: control.id,
                value,
                low: control.low,
                high: control.high,
            });
        }
        // contains() bounds value by an u8 high
        control.value = value as u8;
        Ok(())
    }
}

/// Controls of one device, in registration order.
#[derive(Debug, Default, Clone)]
pub struct ControlTable {
    controls: Vec<Control>,
}

impl ControlTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, control: Control) -> Result<(), ControlError> {
        if control.low > control.high {
            return Err(ControlError::InvalidBounds {
                low: control.low,
                high: control.high,
            });
        }
        if control.name.len() > MAX_CONTROL_NAME {
            return Err(ControlError::NameTooLong(control.name.len()));
        }
        if self.get(control.id).is_some() {
            return Err(ControlError::Duplicate(control.id));
        }
        self.controls.push(control);
        Ok(())
    }

    pub fn get(&self, id: u8) -> Option<&Control> {
        self.controls.iter().find(|control| control.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.controls.iter()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Route a requested value through `setter`.
    ///
    /// The control is left untouched when the setter refuses.
    pub fn set_value<S: ControlSetter + ?Sized>(
        &mut self,
        id: u8,
        value: u32,
        setter: &mut S,
    ) -> Result<u8, SetValueError> {
        let control = self
            .controls
            .iter_mut()
            .find(|control| control.id == id)
            .ok_or(SetValueError::UnknownControl(id))?;
        let mut candidate = control.clone();
        setter.set_value(&mut candidate, value)?;
        debug!("control {id} set to {}", candidate.value);
        *control = candidate;
        Ok(control.value)
    }
}
