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

//! Share ledger.
//!
//! The [`ShareLedger`] owns the ordered payee set, the share weights and, for
//! every asset, the cumulative release counters. It performs no transfers and
//! no authorization; the [`Splitter`](crate::Splitter) drives it.
//!
//! # Accounting epochs
//!
//! A payee's entitlement is `floor(received * shares / total_shares)` minus
//! what it has already been paid. That formula only holds while the share
//! table is fixed, so the ledger numbers every change of the payee set and
//! measures the release counters from the start of the current epoch. The
//! lifetime counters are never reset.
//!
//! ```text
//!  epoch 0            add/remove           epoch 1
//!  ──────────────────────┼──────────────────────────────►
//!  released measured     │  base := released at first credit,
//!  from base₀            │  entitlement measured from base₁
//! ```

use crate::base::{AccountId, Amount, Asset, Shares};
use crate::error::SplitterError;
use serde::Serialize;
use std::collections::HashMap;

/// A share-weighted beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payee {
    pub account: AccountId,
    pub shares: Shares,
}

/// Release counters for a single asset.
#[derive(Debug, Default)]
struct AssetBook {
    total_released: Amount,
    released: HashMap<AccountId, Amount>,
    /// Epoch the base snapshot belongs to, `None` before the first credit.
    epoch: Option<u64>,
    base_total: Amount,
    base: HashMap<AccountId, Amount>,
}

impl AssetBook {
    fn released(&self, account: &AccountId) -> Amount {
        self.released.get(account).copied().unwrap_or_default()
    }

    fn settled_total(&self, epoch: u64) -> Amount {
        if self.epoch == Some(epoch) {
            self.total_released.saturating_sub(self.base_total)
        } else {
            0
        }
    }

    fn settled(&self, epoch: u64, account: &AccountId) -> Amount {
        if self.epoch != Some(epoch) {
            return 0;
        }
        let base = self.base.get(account).copied().unwrap_or_default();
        self.released(account).saturating_sub(base)
    }

    fn rebase(&mut self, epoch: u64, payees: &[Payee]) {
        self.base = payees
            .iter()
            .map(|payee| (payee.account.clone(), self.released(&payee.account)))
            .collect();
        self.base_total = self.total_released;
        self.epoch = Some(epoch);
    }
}

/// Payee set, share weights and per-asset release counters.
///
/// # Invariants
///
/// - `total_shares` equals the sum of the shares of current payees.
/// - Every payee holds a positive share count and appears at most once.
/// - For every asset, the per-account released amounts (current and former
///   payees) sum to the asset's total released.
#[derive(Debug)]
pub struct ShareLedger {
    /// Current payees in insertion order.
    payees: Vec<Payee>,
    total_shares: Shares,
    epoch: u64,
    books: HashMap<Asset, AssetBook>,
    /// Assets settled on payee removal, native first.
    assets: Vec<Asset>,
    /// Every account that has ever been a payee, in first-insertion order.
    accounts: Vec<AccountId>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self {
            payees: Vec::new(),
            total_shares: 0,
            epoch: 0,
            books: HashMap::new(),
            assets: vec![Asset::Native],
            accounts: Vec::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert_eq!(
            self.total_shares,
            self.payees.iter().map(|payee| payee.shares).sum::<Shares>(),
            "Invariant violated: total shares out of sync with payees"
        );
        for (asset, book) in &self.books {
            debug_assert_eq!(
                book.total_released,
                book.released.values().sum::<Amount>(),
                "Invariant violated: released counters for {asset} do not sum to total"
            );
        }
    }

    /// Appends a payee and starts a new accounting epoch.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::InvalidShares`] - `shares` is zero.
    /// - [`SplitterError::DuplicatePayee`] - `account` is already a payee.
    /// - [`SplitterError::Overflow`] - total shares would overflow.
    pub fn add_payee(&mut self, account: AccountId, shares: Shares) -> Result<(), SplitterError> {
        if shares == 0 {
            return Err(SplitterError::InvalidShares);
        }
        if self.is_payee(&account) {
            return Err(SplitterError::DuplicatePayee(account));
        }
        let total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(SplitterError::Overflow)?;

        if !self.accounts.contains(&account) {
            self.accounts.push(account.clone());
        }
        self.payees.push(Payee { account, shares });
        self.total_shares = total_shares;
        self.epoch += 1;
        self.assert_invariants();
        Ok(())
    }

    /// Deletes a payee, keeping its released counters, and starts a new
    /// accounting epoch. Does not settle anything owed to the payee.
    ///
    /// # Errors
    ///
    /// Returns [`SplitterError::UnknownPayee`] if `account` is not a payee.
    pub fn remove_payee(&mut self, account: &AccountId) -> Result<Payee, SplitterError> {
        let index = self
            .position(account)
            .ok_or_else(|| SplitterError::UnknownPayee(account.clone()))?;

        // Vec::remove keeps the remaining payees in insertion order.
        let payee = self.payees.remove(index);
        self.total_shares -= payee.shares;
        self.epoch += 1;
        self.assert_invariants();
        Ok(payee)
    }

    fn position(&self, account: &AccountId) -> Option<usize> {
        self.payees.iter().position(|payee| &payee.account == account)
    }

    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    pub fn payee_count(&self) -> usize {
        self.payees.len()
    }

    pub fn payees(&self) -> &[Payee] {
        &self.payees
    }

    pub fn payee(&self, index: usize) -> Option<&Payee> {
        self.payees.get(index)
    }

    pub fn get(&self, account: &AccountId) -> Option<&Payee> {
        self.payees.iter().find(|payee| &payee.account == account)
    }

    pub fn shares(&self, account: &AccountId) -> Option<Shares> {
        self.get(account).map(|payee| payee.shares)
    }

    pub fn is_payee(&self, account: &AccountId) -> bool {
        self.position(account).is_some()
    }

    /// Every account that has ever been a payee, current ones included.
    pub fn accounts(&self) -> &[AccountId] {
        &self.accounts
    }

    /// Number of payee set changes so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Adds `asset` to the set settled on removal.
    ///
    /// Returns `false` if it was already tracked.
    pub fn track(&mut self, asset: &Asset) -> bool {
        if self.assets.contains(asset) {
            return false;
        }
        self.assets.push(asset.clone());
        true
    }

    pub fn tracked_assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Lifetime amount of `asset` paid to `account`.
    pub fn released(&self, asset: &Asset, account: &AccountId) -> Amount {
        self.books
            .get(asset)
            .map(|book| book.released(account))
            .unwrap_or_default()
    }

    /// Lifetime amount of `asset` paid out by this ledger.
    pub fn total_released(&self, asset: &Asset) -> Amount {
        self.books
            .get(asset)
            .map(|book| book.total_released)
            .unwrap_or_default()
    }

    /// Amount of `asset` released since the current epoch started.
    pub fn settled_total(&self, asset: &Asset) -> Amount {
        self.books
            .get(asset)
            .map(|book| book.settled_total(self.epoch))
            .unwrap_or_default()
    }

    /// Amount currently owed to `payee` when the epoch has received
    /// `total_receivable` of `asset` in total.
    ///
    /// Zero when the payee has already been paid its share.
    pub fn owed(&self, asset: &Asset, payee: &Payee, total_receivable: Amount) -> Amount {
        if self.total_shares == 0 {
            return 0;
        }
        let entitled = mul_div_floor(total_receivable, payee.shares, self.total_shares);
        let settled = self
            .books
            .get(asset)
            .map(|book| book.settled(self.epoch, &payee.account))
            .unwrap_or_default();
        entitled.saturating_sub(settled)
    }

    /// What a release of `distributable` would pay `account` right now.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::UnknownPayee`] - `account` is not a payee.
    /// - [`SplitterError::Overflow`] - the receivable total overflows.
    pub fn pending(
        &self,
        asset: &Asset,
        account: &AccountId,
        distributable: Amount,
    ) -> Result<Amount, SplitterError> {
        let payee = self
            .get(account)
            .ok_or_else(|| SplitterError::UnknownPayee(account.clone()))?;
        let total_receivable = self
            .settled_total(asset)
            .checked_add(distributable)
            .ok_or(SplitterError::Overflow)?;
        Ok(self.owed(asset, payee, total_receivable))
    }

    /// Records `amount` of `asset` as paid to `account`.
    ///
    /// Takes the epoch base snapshot first if this is the asset's first
    /// credit of the epoch.
    pub fn credit(
        &mut self,
        asset: &Asset,
        account: &AccountId,
        amount: Amount,
    ) -> Result<(), SplitterError> {
        let epoch = self.epoch;
        let book = self.books.entry(asset.clone()).or_default();
        if book.epoch != Some(epoch) {
            tracing::debug!(%asset, epoch, "rebasing release counters");
            book.rebase(epoch, &self.payees);
        }

        let total_released = book
            .total_released
            .checked_add(amount)
            .ok_or(SplitterError::Overflow)?;
        let released = book
            .released(account)
            .checked_add(amount)
            .ok_or(SplitterError::Overflow)?;
        book.total_released = total_released;
        book.released.insert(account.clone(), released);
        self.assert_invariants();
        Ok(())
    }

    /// Reverses a [`credit`](Self::credit) whose transfer did not go through.
    pub fn debit(&mut self, asset: &Asset, account: &AccountId, amount: Amount) {
        if let Some(book) = self.books.get_mut(asset) {
            if let Some(released) = book.released.get_mut(account) {
                *released = released.saturating_sub(amount);
            }
            book.total_released = book.total_released.saturating_sub(amount);
        }
        self.assert_invariants();
    }
}

impl Default for ShareLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes `floor(value * numerator / denominator)` without overflowing.
///
/// Requires `numerator <= denominator` and `denominator > 0`; under those
/// bounds the result never exceeds `value`.
pub fn mul_div_floor(value: Amount, numerator: u64, denominator: u64) -> Amount {
    debug_assert!(denominator > 0, "denominator must be positive");
    debug_assert!(numerator <= denominator, "ratio must not exceed one");

    let numerator = Amount::from(numerator);
    let denominator = Amount::from(denominator);
    // (q * d + r) * n / d == q * n + r * n / d, and r * n < d * d fits in u128.
    let quotient = value / denominator;
    let remainder = value % denominator;
    quotient * numerator + remainder * numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> AccountId {
        AccountId::from(name)
    }

    fn ledger_with(payees: &[(&str, Shares)]) -> ShareLedger {
        let mut ledger = ShareLedger::new();
        for (name, shares) in payees {
            ledger.add_payee(account(name), *shares).unwrap();
        }
        ledger
    }

    #[test]
    fn add_payee_tracks_totals_and_order() {
        let ledger = ledger_with(&[("alice", 2), ("bob", 1)]);
        assert_eq!(ledger.total_shares(), 3);
        assert_eq!(ledger.payee_count(), 2);
        assert_eq!(ledger.payee(0).unwrap().account, account("alice"));
        assert_eq!(ledger.payee(1).unwrap().account, account("bob"));
    }

    #[test]
    fn zero_shares_rejected() {
        let mut ledger = ShareLedger::new();
        assert_eq!(
            ledger.add_payee(account("alice"), 0),
            Err(SplitterError::InvalidShares)
        );
        assert_eq!(ledger.payee_count(), 0);
    }

    #[test]
    fn duplicate_payee_rejected() {
        let mut ledger = ledger_with(&[("alice", 2)]);
        assert_eq!(
            ledger.add_payee(account("alice"), 5),
            Err(SplitterError::DuplicatePayee(account("alice")))
        );
        assert_eq!(ledger.total_shares(), 2);
    }

    #[test]
    fn share_overflow_rejected() {
        let mut ledger = ledger_with(&[("alice", u64::MAX)]);
        assert_eq!(
            ledger.add_payee(account("bob"), 1),
            Err(SplitterError::Overflow)
        );
        assert_eq!(ledger.payee_count(), 1);
    }

    #[test]
    fn remove_payee_preserves_order_of_the_rest() {
        let mut ledger = ledger_with(&[("alice", 2), ("bob", 1), ("carol", 4)]);
        let removed = ledger.remove_payee(&account("bob")).unwrap();
        assert_eq!(removed.shares, 1);
        assert_eq!(ledger.total_shares(), 6);
        let order: Vec<_> = ledger.payees().iter().map(|p| p.account.as_str()).collect();
        assert_eq!(order, ["alice", "carol"]);
        assert_eq!(ledger.accounts().len(), 3);
    }

    #[test]
    fn remove_unknown_payee_fails() {
        let mut ledger = ledger_with(&[("alice", 2)]);
        assert_eq!(
            ledger.remove_payee(&account("bob")),
            Err(SplitterError::UnknownPayee(account("bob")))
        );
    }

    #[test]
    fn every_set_change_starts_an_epoch() {
        let mut ledger = ShareLedger::new();
        assert_eq!(ledger.epoch(), 0);
        ledger.add_payee(account("alice"), 1).unwrap();
        ledger.add_payee(account("bob"), 1).unwrap();
        ledger.remove_payee(&account("alice")).unwrap();
        assert_eq!(ledger.epoch(), 3);
    }

    #[test]
    fn owed_is_proportional_share_minus_paid() {
        let mut ledger = ledger_with(&[("alice", 75), ("bob", 25)]);
        let asset = Asset::Native;
        let alice = ledger.get(&account("alice")).unwrap().clone();

        assert_eq!(ledger.owed(&asset, &alice, 100), 75);
        ledger.credit(&asset, &account("alice"), 75).unwrap();
        assert_eq!(ledger.owed(&asset, &alice, 100), 0);
        assert_eq!(ledger.owed(&asset, &alice, 200), 75);
    }

    #[test]
    fn counters_restart_from_base_after_set_change() {
        let mut ledger = ledger_with(&[("alice", 1), ("bob", 1)]);
        let asset = Asset::Native;
        ledger.credit(&asset, &account("alice"), 50).unwrap();
        ledger.credit(&asset, &account("bob"), 50).unwrap();
        assert_eq!(ledger.settled_total(&asset), 100);

        ledger.add_payee(account("carol"), 2).unwrap();
        assert_eq!(ledger.settled_total(&asset), 0);
        assert_eq!(ledger.pending(&asset, &account("carol"), 40).unwrap(), 20);
        assert_eq!(ledger.pending(&asset, &account("alice"), 40).unwrap(), 10);

        // Lifetime counters survive the epoch change.
        assert_eq!(ledger.total_released(&asset), 100);
        assert_eq!(ledger.released(&asset, &account("alice")), 50);
    }

    #[test]
    fn debit_reverses_credit() {
        let mut ledger = ledger_with(&[("alice", 1)]);
        let asset = Asset::token("0xvtho");
        ledger.credit(&asset, &account("alice"), 30).unwrap();
        ledger.debit(&asset, &account("alice"), 30);
        assert_eq!(ledger.total_released(&asset), 0);
        assert_eq!(ledger.released(&asset, &account("alice")), 0);
    }

    #[test]
    fn assets_are_accounted_independently() {
        let mut ledger = ledger_with(&[("alice", 1)]);
        ledger.credit(&Asset::Native, &account("alice"), 10).unwrap();
        assert_eq!(ledger.total_released(&Asset::token("0xvtho")), 0);
        assert_eq!(ledger.released(&Asset::Native, &account("alice")), 10);
    }

    #[test]
    fn native_is_tracked_by_default() {
        let mut ledger = ShareLedger::new();
        assert_eq!(ledger.tracked_assets(), [Asset::Native]);
        assert!(ledger.track(&Asset::token("0xvtho")));
        assert!(!ledger.track(&Asset::token("0xvtho")));
        assert_eq!(ledger.tracked_assets().len(), 2);
    }

    #[test]
    fn mul_div_floor_truncates() {
        assert_eq!(mul_div_floor(100, 1, 3), 33);
        assert_eq!(mul_div_floor(100, 2, 3), 66);
        assert_eq!(mul_div_floor(10_000, 1, 100), 100);
        assert_eq!(mul_div_floor(7, 0, 5), 0);
        assert_eq!(mul_div_floor(7, 5, 5), 7);
    }

    #[test]
    fn mul_div_floor_does_not_overflow_at_the_top_of_the_range() {
        assert_eq!(mul_div_floor(u128::MAX, u64::MAX, u64::MAX), u128::MAX);
        assert_eq!(mul_div_floor(u128::MAX, 1, 2), u128::MAX / 2);
        let third = mul_div_floor(u128::MAX, u64::MAX / 3, u64::MAX);
        assert!(third <= u128::MAX / 3 + 1);
    }
}
