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

//! Asset custody.
//!
//! The [`AssetAccount`] trait is the seam between the distribution engine
//! and whatever actually holds the funds. [`Vault`] is a concurrent
//! in-memory implementation holding balances for any number of accounts.
//!
//! # Example
//!
//! ```
//! use payment_splitter::{AccountId, Asset, AssetAccount, Vault};
//!
//! let vault = Vault::new(AccountId::from("splitter"));
//! vault.deposit(&Asset::Native, 100);
//! vault.transfer(&Asset::Native, &AccountId::from("alice"), 40).unwrap();
//! assert_eq!(vault.balance_of(&Asset::Native, vault.holder()), 60);
//! ```

use crate::base::{AccountId, Amount, Asset};
use crate::error::TransferError;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

/// Holdings of a shared account.
///
/// `transfer` moves funds out of [`holder`](AssetAccount::holder). A
/// transfer may call back into the caller before returning.
pub trait AssetAccount {
    /// The account whose balances are distributed.
    fn holder(&self) -> &AccountId;

    /// Balance of `asset` held by `account`.
    fn balance_of(&self, asset: &Asset, account: &AccountId) -> Amount;

    /// Sends `amount` of `asset` from the holder to `to`.
    fn transfer(&self, asset: &Asset, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

impl<T: AssetAccount + ?Sized> AssetAccount for Arc<T> {
    fn holder(&self) -> &AccountId {
        (**self).holder()
    }

    fn balance_of(&self, asset: &Asset, account: &AccountId) -> Amount {
        (**self).balance_of(asset, account)
    }

    fn transfer(&self, asset: &Asset, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        (**self).transfer(asset, to, amount)
    }
}

/// In-memory custody for native and token balances.
///
/// Accounts listed with [`reject`](Vault::reject) refuse incoming funds,
/// which is how a recipient that cannot accept payment behaves.
#[derive(Debug)]
pub struct Vault {
    holder: AccountId,
    balances: DashMap<(Asset, AccountId), Amount>,
    rejecting: DashSet<AccountId>,
}

impl Vault {
    pub fn new(holder: AccountId) -> Self {
        Self {
            holder,
            balances: DashMap::new(),
            rejecting: DashSet::new(),
        }
    }

    /// Credits the holder with `amount` of `asset`.
    pub fn deposit(&self, asset: &Asset, amount: Amount) {
        self.credit(asset, &self.holder, amount);
    }

    /// Credits any account with `amount` of `asset`.
    pub fn credit(&self, asset: &Asset, account: &AccountId, amount: Amount) {
        let mut balance = self
            .balances
            .entry((asset.clone(), account.clone()))
            .or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Makes `account` refuse all incoming transfers.
    pub fn reject(&self, account: AccountId) {
        self.rejecting.insert(account);
    }

    /// Lets `account` receive transfers again.
    pub fn accept(&self, account: &AccountId) {
        self.rejecting.remove(account);
    }
}

impl AssetAccount for Vault {
    fn holder(&self) -> &AccountId {
        &self.holder
    }

    fn balance_of(&self, asset: &Asset, account: &AccountId) -> Amount {
        self.balances
            .get(&(asset.clone(), account.clone()))
            .map(|balance| *balance)
            .unwrap_or_default()
    }

    fn transfer(&self, asset: &Asset, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError::Rejected);
        }

        // Debit under the entry lock so concurrent transfers cannot overdraw.
        {
            let mut balance = self
                .balances
                .entry((asset.clone(), self.holder.clone()))
                .or_insert(0);
            if *balance < amount {
                return Err(TransferError::Insufficient {
                    needed: amount,
                    available: *balance,
                });
            }
            *balance -= amount;
        }

        self.credit(asset, to, amount);
        Ok(())
    }
}
