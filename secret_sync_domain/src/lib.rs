// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Sync Domain Layer
//!
//! Pure business logic for the secret synchronization engine: entities,
//! value objects, domain services, and the capability ports implemented by
//! the infrastructure layer.
//!
//! ## Overview
//!
//! The domain layer models a batch reconciler that moves secret material
//! from a hierarchical source store into flat, per-account target stores
//! through an intermediate merge store:
//!
//! - **Entities**: sources, targets, discovered accounts, and run outcomes
//! - **Value Objects**: validated store paths, account ids, bundle ids,
//!   secrets, run ids, and parallelism bounds
//! - **Domain Services**: deep merge policy, diff computation, name
//!   resolution, and the target dependency graph
//! - **Stores**: async capability traits for the source store, target
//!   store, merge store, and account directory
//!
//! ## Layering Rules
//!
//! This crate contains no I/O and no runtime. The store traits are async
//! ports that infrastructure adapters implement; everything else is
//! synchronous, deterministic, and fully unit-testable.

pub mod entities;
pub mod error;
pub mod services;
pub mod stores;
pub mod value_objects;

// Re-export commonly used types for convenient access
// These exports provide a clean API surface for consumers of the domain layer
pub use entities::{AccountInfo, Bundle, DynamicTarget, ImportRef, Phase, RunReport, Source, Target, TargetOutcome};
pub use error::SyncError;
pub use value_objects::{AccountId, BundleId, Parallelism, RunId, Secret, SecretPath};
