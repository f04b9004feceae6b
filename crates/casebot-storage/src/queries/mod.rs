// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for cases and conversation messages.

pub mod cases;
pub mod messages;
