// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Entity
//!
//! A `System` is an ordered list of pipelines that a dispatcher runs
//! strictly sequentially, aborting the remaining pipelines the moment one of
//! them reports a terminal signal. The entity itself carries no execution
//! logic — `canonada-runtime`'s dispatcher walks `pipelines()` in order and
//! decides what "abort" means operationally (see `System::name`/`description`
//! invariants, which mirror [`crate::entities::Pipeline`]).

use crate::error::{CoreError, CoreResult};

use super::pipeline::Pipeline;

pub struct System {
    name: String,
    description: Option<String>,
    pipelines: Vec<Pipeline>,
}

impl System {
    pub fn new(name: impl Into<String>, pipelines: Vec<Pipeline>) -> CoreResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::config("system name must not be empty"));
        }
        Ok(Self { name, description: None, pipelines })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    pub fn pipelines_mut(&mut self) -> &mut [Pipeline] {
        &mut self.pipelines
    }
}
