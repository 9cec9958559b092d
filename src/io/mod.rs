// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - CityJSON reading and writing

mod cityjson;
mod writer;

pub use cityjson::{parse_and_select, CityJsonDocument, ObjectSummary};
pub use writer::{shell_document, write_shell, CITYJSON_VERSION};
