// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The project-less default binary: an empty definition environment, so
//! `new`, `version`, and `catalog` work out of the box while `registry` and
//! `run` report that nothing is registered. A real project links
//! `canonada-cli` as a library instead and calls [`canonada_cli::run_cli`]
//! with its own populated registries.

use canonada_cli::registries::ProjectRegistries;

fn main() {
    let exit_code = canonada_cli::run_cli(ProjectRegistries::new());
    std::process::exit(exit_code.as_i32());
}
