// SPDX-License-Identifier: MIT

pub mod remedy;
pub mod runtime;
