// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Node-kind descriptors.
//!
//! A [`NodeKind`] is an immutable catalog entry: an id plus the ordered pin
//! signature instances of that kind expose. Kinds are produced once by the
//! host catalog snapshot and shared read-only from then on.

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::ids::KindId;
use super::value::{DataType, Value};

/// One input or output slot in a kind's signature.
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    name: SmolStr,
    data_type: DataType,
    default: Option<Value>,
}

impl PinSpec {
    pub fn new(name: impl AsRef<str>, data_type: DataType) -> Self {
        Self {
            name: SmolStr::new(name.as_ref()),
            data_type,
            default: None,
        }
    }

    pub fn with_default(name: impl AsRef<str>, data_type: DataType, default: Value) -> Self {
        Self {
            name: SmolStr::new(name.as_ref()),
            data_type,
            default: Some(default),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// An input must be bound (link or literal) before staging unless the
    /// catalog declares a default for it. Exec pins are wiring, not data, and
    /// are covered by the reachability validation instead.
    pub fn is_required(&self) -> bool {
        self.data_type != DataType::Exec && self.default.is_none()
    }
}

/// Most kinds have a handful of pins, so the list stays inline.
pub type PinList = SmallVec<[PinSpec; 4]>;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeKind {
    kind_id: KindId,
    label: String,
    inputs: PinList,
    outputs: PinList,
}

impl NodeKind {
    pub fn new(
        kind_id: KindId,
        label: impl Into<String>,
        inputs: impl IntoIterator<Item = PinSpec>,
        outputs: impl IntoIterator<Item = PinSpec>,
    ) -> Self {
        Self {
            kind_id,
            label: label.into(),
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    pub fn kind_id(&self) -> &KindId {
        &self.kind_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn inputs(&self) -> &[PinSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PinSpec] {
        &self.outputs
    }

    pub fn input(&self, index: u32) -> Option<&PinSpec> {
        self.inputs.get(index as usize)
    }

    pub fn output(&self, index: u32) -> Option<&PinSpec> {
        self.outputs.get(index as usize)
    }

    pub fn input_by_name(&self, name: &str) -> Option<(u32, &PinSpec)> {
        self.inputs
            .iter()
            .enumerate()
            .find(|(_, pin)| pin.name() == name)
            .map(|(index, pin)| (index as u32, pin))
    }

    /// Entry kinds start a control-flow chain: they expose exec outputs but
    /// take no exec input (the host fires them).
    pub fn is_exec_entry(&self) -> bool {
        self.inputs.iter().all(|pin| pin.data_type() != DataType::Exec)
            && self.outputs.iter().any(|pin| pin.data_type() == DataType::Exec)
    }

    pub fn has_exec_pins(&self) -> bool {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .any(|pin| pin.data_type() == DataType::Exec)
    }
}
