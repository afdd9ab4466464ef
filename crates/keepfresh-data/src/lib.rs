// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory implementations of the host collaborators.
//!
//! [`InMemoryUserStore`] and [`InMemoryHost`] are complete, thread-safe
//! implementations of the `keepfresh-core` host contracts. They back the demo
//! sandbox and the engine's integration tests, and are a reasonable starting
//! point for hosts that keep their users in process.

#![warn(missing_docs)]

pub mod memory_host;
pub mod memory_store;

pub use memory_host::{DispatchStats, InMemoryHost};
pub use memory_store::InMemoryUserStore;
