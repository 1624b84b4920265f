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

//! Share tables derived from an ownership registry.
//!
//! Each position held in an enumerable registry counts as one share for its
//! owner. The resulting table is what an operator feeds into
//! [`Splitter::add_payee`](crate::Splitter::add_payee).

use crate::base::{AccountId, Shares};
use std::collections::HashMap;

/// Enumerable ownership of share-weighted positions.
pub trait OwnershipRegistry {
    type TokenId;

    fn total_supply(&self) -> usize;

    /// Token at `index`, for `index < total_supply()`.
    fn token_by_index(&self, index: usize) -> Option<Self::TokenId>;

    fn owner_of(&self, token: &Self::TokenId) -> Option<AccountId>;
}

/// Counts positions per owner, in the order owners are first seen.
///
/// Indices without a token or a token without an owner are skipped.
pub fn share_table<R: OwnershipRegistry + ?Sized>(registry: &R) -> Vec<(AccountId, Shares)> {
    let mut table: Vec<(AccountId, Shares)> = Vec::new();
    let mut index_of: HashMap<AccountId, usize> = HashMap::new();

    for index in 0..registry.total_supply() {
        let Some(owner) = registry
            .token_by_index(index)
            .and_then(|token| registry.owner_of(&token))
        else {
            tracing::debug!(index, "skipping position without owner");
            continue;
        };
        match index_of.get(&owner) {
            Some(&slot) => table[slot].1 += 1,
            None => {
                index_of.insert(owner.clone(), table.len());
                table.push((owner, 1));
            }
        }
    }

    table
}
