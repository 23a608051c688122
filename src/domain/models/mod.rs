// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod checkpoint;
pub mod task;
pub mod thread;

pub use checkpoint::Checkpoint;
pub use task::HarvestTask;
pub use thread::ThreadRef;
