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

use keepfresh_core::{Asset, Digest, FreshnessResult};
use std::sync::Arc;

/// Lifecycle of an installed tracker.
///
/// `Initializing -> Ready -> Uninstalled`. Teardown may also happen straight
/// from `Initializing`. There is no way back from `Uninstalled`; install a new
/// engine instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// The initial digest is set and the install-time sweep, if any, is running.
    Initializing,
    /// Initialization finished; hot updates run immediately.
    Ready,
    /// The receive handler was removed from the host.
    Uninstalled,
}

/// The current asset together with its digest.
///
/// The pair is only ever replaced as a whole, so a reader can never observe
/// the digest of one asset next to another asset.
#[derive(Debug)]
pub(crate) struct AssetSnapshot {
    pub asset: Arc<Asset>,
    pub digest: Digest,
}

impl AssetSnapshot {
    pub fn new(asset: Asset) -> FreshnessResult<Self> {
        let digest = asset.digest()?;
        Ok(Self {
            asset: Arc::new(asset),
            digest,
        })
    }
}
