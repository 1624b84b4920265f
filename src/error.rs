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

//! Error types for ledger and distribution operations.

use crate::base::AccountId;
use crate::engine::Payout;
use thiserror::Error;

/// Errors returned by share ledger mutations and release calls.
///
/// Every error aborts the call it was raised by; nothing owed is not an
/// error and surfaces as an empty payout list instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitterError {
    /// Caller lacks the permission the action requires
    #[error("caller {0} is not authorized")]
    NotAuthorized(AccountId),

    /// Account already holds an active payee entry
    #[error("account {0} is already a payee")]
    DuplicatePayee(AccountId),

    /// Account is not a current payee
    #[error("account {0} has no shares")]
    UnknownPayee(AccountId),

    /// Share count is zero
    #[error("invalid shares (must be positive)")]
    InvalidShares,

    /// Fraction has a zero denominator or exceeds one
    #[error("invalid fraction {num}/{den}")]
    InvalidFraction { num: u64, den: u64 },

    /// Explicit release amount exceeds the held balance
    #[error("release of {requested} exceeds balance of {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    /// Custody rejected the payout to a payee
    ///
    /// `completed` lists the payouts the same call executed before the
    /// failure. They have left custody and stay recorded.
    #[error(
        "transfer to {payee} failed after {count} completed payouts: {source}",
        count = .completed.len()
    )]
    TransferFailed {
        payee: AccountId,
        #[source]
        source: TransferError,
        completed: Vec<Payout>,
    },

    /// Release attempted while total shares is zero
    #[error("no shares to distribute against")]
    NoShares,

    /// Arithmetic would exceed the representable range
    #[error("arithmetic overflow")]
    Overflow,
}

/// Failure reported by an asset custody transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Recipient refuses incoming funds
    #[error("recipient rejected funds")]
    Rejected,

    /// Holder does not have the amount being sent
    #[error("custody holds {available}, needs {needed}")]
    Insufficient { needed: u128, available: u128 },
}
