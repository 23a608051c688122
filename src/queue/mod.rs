// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod audit;
pub mod task_queue;

pub use task_queue::{QueueError, RedisTaskQueue, TaskQueue};
