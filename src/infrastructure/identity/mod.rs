// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod credential_pool;
pub mod egress_pool;

pub use credential_pool::CredentialPool;
pub use egress_pool::{EgressPool, NextEgress};
