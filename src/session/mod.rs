// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawl_session;
pub mod driver;
pub mod faults;
pub mod intervention;
pub mod markers;
pub mod parser;

pub use crawl_session::{CrawlSession, SessionTuning};
pub use driver::{DriverError, DriverProvider, HttpDriverProvider, PageDriver, SessionIdentity};
pub use faults::{classify, FaultKind, SessionFault};
pub use intervention::{InterventionGate, StdinGate};
pub use markers::PageMarkers;
pub use parser::{ForumParser, TiebaParser};
