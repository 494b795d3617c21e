// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Value Objects
//!
//! Immutable, validated value types shared across the synchronization
//! engine. Every value that crosses a trust boundary (store paths, account
//! ids) is represented by a newtype that validates on construction, so the
//! rest of the domain can rely on well-formed inputs.

pub mod account_id;
pub mod bundle_id;
pub mod parallelism;
pub mod request_id;
pub mod secret;
pub mod secret_path;

pub use account_id::AccountId;
pub use bundle_id::BundleId;
pub use parallelism::Parallelism;
pub use request_id::RunId;
pub use secret::Secret;
pub use secret_path::SecretPath;
