// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Splitter configuration.

use crate::access::Posture;
use crate::base::AccountId;
use serde::Deserialize;

/// Settings a [`Splitter`](crate::Splitter) is built from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Account whose balances are distributed.
    pub holder: AccountId,
    /// Accounts holding the administrator role.
    pub admins: Vec<AccountId>,
    pub posture: Posture,
}

impl SplitterConfig {
    pub const DEFAULT_HOLDER: &'static str = "splitter";
    pub const DEFAULT_ADMIN: &'static str = "admin";
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            holder: AccountId::from(Self::DEFAULT_HOLDER),
            admins: vec![AccountId::from(Self::DEFAULT_ADMIN)],
            posture: Posture::Strict,
        }
    }
}
