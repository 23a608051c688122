// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod checkpoint;
pub mod identity;
pub mod storage;

pub use checkpoint::{CheckpointError, CheckpointStore};
pub use storage::{FsHarvestStore, HarvestStore, StorageError};
