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

//! Distribution engine.
//!
//! The [`Splitter`] is the central component: it authorizes callers,
//! observes balances through an [`AssetAccount`], asks the [`ShareLedger`]
//! what each payee is owed and pays it out.
//!
//! # Release algorithm
//!
//! Every release mode runs the same steps for an asset, a set of targets
//! and an amount treated as distributable by this call:
//!
//! 1. `total_receivable = released_this_epoch + distributable`
//! 2. per target, in ledger order:
//!    `owed = floor(total_receivable * shares / total_shares) - paid_this_epoch`
//! 3. if `owed > 0`, credit the counters, then transfer.
//!
//! | Mode | Targets | Distributable |
//! |------|---------|---------------|
//! | Full | all payees | current balance |
//! | Fractional `(num, den)` | all payees | `floor(balance * num / den)` |
//! | Explicit amount | all payees | `amount` (must not exceed balance) |
//! | Single payee | one payee | current balance |
//!
//! # Thread Safety
//!
//! All state lives behind one [`ReentrantMutex`], so calls are serialized per
//! splitter. A recipient may call back into the splitter from inside a
//! transfer on the same thread; counters are already credited by then.

use crate::access::{AccessGate, Action, RoleGate};
use crate::base::{AccountId, Amount, Asset, Shares};
use crate::config::SplitterConfig;
use crate::custody::AssetAccount;
use crate::error::SplitterError;
use crate::event::{Event, EventJournal};
use crate::ledger::{Payee, ShareLedger, mul_div_floor};
use crate::statement::PayeeStatement;
use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::cell::RefCell;

/// A transfer executed by a release call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub asset: Asset,
    pub payee: AccountId,
    pub amount: Amount,
}

/// Which payees a release call pays.
#[derive(Debug, Clone, Copy)]
enum Targets<'a> {
    All,
    One(&'a AccountId),
}

/// Proportional distribution ledger over a shared account.
///
/// # Invariants
///
/// - A call that fails validation changes nothing.
/// - Counters are credited before the matching transfer and debited again
///   if the transfer is rejected.
/// - Within an accounting epoch a payee never receives more than its share
///   of everything released plus the current distributable amount.
pub struct Splitter<G, C> {
    gate: G,
    custody: C,
    ledger: ReentrantMutex<RefCell<ShareLedger>>,
    journal: EventJournal,
}

impl<C: AssetAccount> Splitter<RoleGate, C> {
    /// Builds a splitter guarded by a [`RoleGate`] described by `config`.
    ///
    /// The configured holder must be the custody's holder; the custody is
    /// what actually owns the funds.
    pub fn from_config(config: &SplitterConfig, custody: C) -> Self {
        if &config.holder != custody.holder() {
            tracing::warn!(
                configured = %config.holder,
                custody = %custody.holder(),
                "configured holder differs from custody holder"
            );
        }
        let gate = RoleGate::with_admins(config.posture, config.admins.iter().cloned());
        tracing::debug!(
            posture = ?gate.posture(),
            admins = config.admins.len(),
            "access gate configured"
        );
        Self::new(gate, custody)
    }
}

impl<G: AccessGate, C: AssetAccount> Splitter<G, C> {
    /// Creates a splitter with no payees.
    pub fn new(gate: G, custody: C) -> Self {
        Self {
            gate,
            custody,
            ledger: ReentrantMutex::new(RefCell::new(ShareLedger::new())),
            journal: EventJournal::new(),
        }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    fn authorize(&self, caller: &AccountId, action: Action<'_>) -> Result<(), SplitterError> {
        if self.gate.is_authorized(caller, action) {
            Ok(())
        } else {
            tracing::debug!(%caller, ?action, "rejected unauthorized call");
            Err(SplitterError::NotAuthorized(caller.clone()))
        }
    }

    fn balance(&self, asset: &Asset) -> Amount {
        self.custody.balance_of(asset, self.custody.holder())
    }

    // === Share table ===

    /// Appends a payee.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotAuthorized`] - caller may not add payees.
    /// - [`SplitterError::InvalidShares`] - `shares` is zero.
    /// - [`SplitterError::DuplicatePayee`] - `account` is already a payee.
    pub fn add_payee(
        &self,
        caller: &AccountId,
        account: AccountId,
        shares: Shares,
    ) -> Result<(), SplitterError> {
        self.authorize(caller, Action::AddPayee { account: &account })?;

        let guard = self.ledger.lock();
        guard.borrow_mut().add_payee(account.clone(), shares)?;
        tracing::info!(%account, shares, "payee added");
        self.journal.record(Event::PayeeAdded { account, shares });
        Ok(())
    }

    /// Settles everything owed to `account` on every tracked asset, then
    /// removes it from the payee set.
    ///
    /// Its released counters are kept.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotAuthorized`] - caller may not remove payees.
    /// - [`SplitterError::UnknownPayee`] - `account` is not a payee.
    /// - [`SplitterError::TransferFailed`] - a settlement payout was rejected;
    ///   the payee stays in place and `completed` holds the settlements
    ///   already paid on earlier assets.
    pub fn remove_payee(
        &self,
        caller: &AccountId,
        account: &AccountId,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.authorize(caller, Action::RemovePayee { account })?;

        let guard = self.ledger.lock();
        let assets = {
            let ledger = guard.borrow();
            if !ledger.is_payee(account) {
                return Err(SplitterError::UnknownPayee(account.clone()));
            }
            ledger.tracked_assets().to_vec()
        };

        let mut payouts = Vec::new();
        for asset in &assets {
            if !guard.borrow().is_payee(account) {
                break;
            }
            let balance = self.balance(asset);
            if balance == 0 {
                continue;
            }
            match self.distribute(asset, Targets::One(account), balance) {
                Ok(settled) => payouts.extend(settled),
                Err(SplitterError::TransferFailed {
                    payee,
                    source,
                    completed,
                }) => {
                    payouts.extend(completed);
                    return Err(SplitterError::TransferFailed {
                        payee,
                        source,
                        completed: payouts,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // A recipient callback during settlement may already have removed it.
        if !guard.borrow().is_payee(account) {
            tracing::debug!(%account, "payee removed during settlement");
            return Ok(payouts);
        }
        let removed = guard.borrow_mut().remove_payee(account)?;
        tracing::info!(account = %removed.account, shares = removed.shares, "payee removed");
        self.journal.record(Event::PayeeRemoved {
            account: removed.account,
            shares: removed.shares,
        });
        Ok(payouts)
    }

    /// Starts tracking `token` so that payee removal settles it.
    ///
    /// Returns `false` if it was already tracked.
    pub fn track_token(&self, caller: &AccountId, token: AccountId) -> Result<bool, SplitterError> {
        let asset = Asset::Token(token);
        self.authorize(caller, Action::TrackAsset { asset: &asset })?;
        let guard = self.ledger.lock();
        let tracked = guard.borrow_mut().track(&asset);
        Ok(tracked)
    }

    // === Queries ===

    pub fn total_shares(&self) -> Shares {
        self.ledger.lock().borrow().total_shares()
    }

    pub fn payee_count(&self) -> usize {
        self.ledger.lock().borrow().payee_count()
    }

    /// Current payees in insertion order.
    pub fn payees(&self) -> Vec<Payee> {
        self.ledger.lock().borrow().payees().to_vec()
    }

    pub fn payee(&self, index: usize) -> Option<Payee> {
        self.ledger.lock().borrow().payee(index).cloned()
    }

    pub fn shares(&self, account: &AccountId) -> Option<Shares> {
        self.ledger.lock().borrow().shares(account)
    }

    pub fn is_payee(&self, account: &AccountId) -> bool {
        self.ledger.lock().borrow().is_payee(account)
    }

    pub fn released(&self, asset: &Asset, account: &AccountId) -> Amount {
        self.ledger.lock().borrow().released(asset, account)
    }

    pub fn total_released(&self, asset: &Asset) -> Amount {
        self.ledger.lock().borrow().total_released(asset)
    }

    pub fn tracked_assets(&self) -> Vec<Asset> {
        self.ledger.lock().borrow().tracked_assets().to_vec()
    }

    /// What [`release_payee`](Self::release_payee) would pay `account` now.
    pub fn releasable(&self, asset: &Asset, account: &AccountId) -> Result<Amount, SplitterError> {
        let guard = self.ledger.lock();
        let balance = self.balance(asset);
        guard.borrow().pending(asset, account, balance)
    }

    /// Accounting rows for every current and former payee.
    pub fn statements(&self, asset: &Asset) -> Vec<PayeeStatement> {
        let guard = self.ledger.lock();
        let ledger = guard.borrow();
        PayeeStatement::collect(&ledger, asset)
    }

    /// Removes and returns the events recorded so far.
    pub fn drain_events(&self) -> Vec<Event> {
        self.journal.drain()
    }

    // === Native asset releases ===

    /// Releases the whole native balance to every payee.
    pub fn release(&self, caller: &AccountId) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset(caller, &Asset::Native)
    }

    /// Releases the native share owed to `payee` alone.
    pub fn release_payee(
        &self,
        caller: &AccountId,
        payee: &AccountId,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset_payee(caller, &Asset::Native, payee)
    }

    /// Releases `num / den` of the native balance to every payee.
    pub fn release_in_shares(
        &self,
        caller: &AccountId,
        num: u64,
        den: u64,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset_in_shares(caller, &Asset::Native, num, den)
    }

    /// Releases exactly `amount` of the native balance to every payee.
    pub fn release_balance(
        &self,
        caller: &AccountId,
        amount: Amount,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset_balance(caller, &Asset::Native, amount)
    }

    // === Token releases ===

    pub fn release_token(
        &self,
        caller: &AccountId,
        token: &AccountId,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset(caller, &Asset::Token(token.clone()))
    }

    pub fn release_token_payee(
        &self,
        caller: &AccountId,
        token: &AccountId,
        payee: &AccountId,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset_payee(caller, &Asset::Token(token.clone()), payee)
    }

    pub fn release_token_in_shares(
        &self,
        caller: &AccountId,
        token: &AccountId,
        num: u64,
        den: u64,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset_in_shares(caller, &Asset::Token(token.clone()), num, den)
    }

    pub fn release_token_balance(
        &self,
        caller: &AccountId,
        token: &AccountId,
        amount: Amount,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.release_asset_balance(caller, &Asset::Token(token.clone()), amount)
    }

    // === Asset-generic releases ===

    /// Full release: the whole balance of `asset` to every payee.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotAuthorized`] - caller may not trigger releases.
    /// - [`SplitterError::NoShares`] - there are no payees.
    /// - [`SplitterError::TransferFailed`] - custody rejected a payout;
    ///   `completed` holds the payouts made before it.
    pub fn release_asset(
        &self,
        caller: &AccountId,
        asset: &Asset,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.authorize(caller, Action::Release { asset })?;
        let _guard = self.ledger.lock();
        let balance = self.balance(asset);
        self.distribute(asset, Targets::All, balance)
    }

    /// Single-payee release: pays only what `payee` is owed from the whole
    /// balance of `asset`.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotAuthorized`] - caller may not release to `payee`.
    /// - [`SplitterError::UnknownPayee`] - `payee` is not a payee.
    /// - [`SplitterError::TransferFailed`] - custody rejected the payout.
    pub fn release_asset_payee(
        &self,
        caller: &AccountId,
        asset: &Asset,
        payee: &AccountId,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.authorize(caller, Action::ReleasePayee { asset, payee })?;
        let _guard = self.ledger.lock();
        let balance = self.balance(asset);
        self.distribute(asset, Targets::One(payee), balance)
    }

    /// Fractional release: `floor(balance * num / den)` to every payee.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotAuthorized`] - caller may not trigger releases.
    /// - [`SplitterError::InvalidFraction`] - `den` is zero or `num > den`.
    /// - [`SplitterError::NoShares`] - there are no payees.
    /// - [`SplitterError::TransferFailed`] - custody rejected a payout.
    pub fn release_asset_in_shares(
        &self,
        caller: &AccountId,
        asset: &Asset,
        num: u64,
        den: u64,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.authorize(caller, Action::Release { asset })?;
        if den == 0 || num > den {
            return Err(SplitterError::InvalidFraction { num, den });
        }
        let _guard = self.ledger.lock();
        let distributable = mul_div_floor(self.balance(asset), num, den);
        self.distribute(asset, Targets::All, distributable)
    }

    /// Explicit-amount release: exactly `amount` treated as distributable.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotAuthorized`] - caller may not trigger releases.
    /// - [`SplitterError::InsufficientBalance`] - `amount` exceeds the balance.
    /// - [`SplitterError::NoShares`] - there are no payees.
    /// - [`SplitterError::TransferFailed`] - custody rejected a payout.
    pub fn release_asset_balance(
        &self,
        caller: &AccountId,
        asset: &Asset,
        amount: Amount,
    ) -> Result<Vec<Payout>, SplitterError> {
        self.authorize(caller, Action::Release { asset })?;
        let _guard = self.ledger.lock();
        let available = self.balance(asset);
        if amount > available {
            return Err(SplitterError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.distribute(asset, Targets::All, amount)
    }

    /// Pays every target what it is owed when `distributable` more of
    /// `asset` is made available.
    ///
    /// Must be called with the ledger lock held. No `RefCell` borrow is held
    /// across a transfer, so a recipient may re-enter the splitter.
    fn distribute(
        &self,
        asset: &Asset,
        targets: Targets<'_>,
        distributable: Amount,
    ) -> Result<Vec<Payout>, SplitterError> {
        let guard = self.ledger.lock();

        let (epoch, total_receivable, targets) = {
            let mut ledger = guard.borrow_mut();
            if ledger.total_shares() == 0 {
                return Err(SplitterError::NoShares);
            }
            let targets: Vec<Payee> = match targets {
                Targets::All => ledger.payees().to_vec(),
                Targets::One(account) => vec![
                    ledger
                        .get(account)
                        .cloned()
                        .ok_or_else(|| SplitterError::UnknownPayee(account.clone()))?,
                ],
            };
            let total_receivable = ledger
                .settled_total(asset)
                .checked_add(distributable)
                .ok_or(SplitterError::Overflow)?;
            ledger.track(asset);
            (ledger.epoch(), total_receivable, targets)
        };

        let mut payouts = Vec::new();
        for payee in targets {
            let amount = {
                let mut ledger = guard.borrow_mut();
                if ledger.epoch() != epoch {
                    tracing::debug!(%asset, "payee set changed during release, stopping");
                    break;
                }
                let owed = ledger.owed(asset, &payee, total_receivable);
                if owed == 0 {
                    tracing::debug!(%asset, payee = %payee.account, "nothing owed");
                    continue;
                }
                ledger.credit(asset, &payee.account, owed)?;
                owed
            };

            if let Err(source) = self.custody.transfer(asset, &payee.account, amount) {
                guard.borrow_mut().debit(asset, &payee.account, amount);
                tracing::warn!(%asset, payee = %payee.account, amount, %source, "transfer rejected");
                return Err(SplitterError::TransferFailed {
                    payee: payee.account,
                    source,
                    completed: payouts,
                });
            }

            tracing::info!(%asset, payee = %payee.account, amount, "payment released");
            self.journal.record(Event::PaymentReleased {
                asset: asset.clone(),
                payee: payee.account.clone(),
                amount,
            });
            payouts.push(Payout {
                asset: asset.clone(),
                payee: payee.account,
                amount,
            });
        }

        Ok(payouts)
    }
}
