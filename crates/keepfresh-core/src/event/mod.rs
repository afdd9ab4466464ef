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

//! Channels feeding inbound events from a transport into a host.
//!
//! Transports publish on an [`EventBus`]; the host drains its receiver and
//! dispatches each event to the registered receive handlers. The bus is
//! generic so hosts can carry their own event types.

mod bus;

pub use self::bus::EventBus;
