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

//! Per-payee accounting statements.
//!
//! # Example
//!
//! ```
//! use payment_splitter::{AccountId, Asset, PayeeStatement, ShareLedger};
//!
//! let mut ledger = ShareLedger::new();
//! ledger.add_payee(AccountId::from("alice"), 3).unwrap();
//! let rows = PayeeStatement::collect(&ledger, &Asset::Native);
//! assert_eq!(rows[0].shares, 3);
//! ```

use crate::base::{AccountId, Amount, Asset, Shares};
use crate::ledger::ShareLedger;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// What one account holds and has been paid in one asset.
///
/// Former payees appear with zero shares and their frozen released amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayeeStatement {
    pub asset: Asset,
    pub payee: AccountId,
    pub shares: Shares,
    pub total_shares: Shares,
    pub released: Amount,
}

impl PayeeStatement {
    const DECIMAL_PRECISION: u32 = 4;

    /// One row per account that has ever been a payee, in first-insertion
    /// order.
    pub fn collect(ledger: &ShareLedger, asset: &Asset) -> Vec<Self> {
        ledger
            .accounts()
            .iter()
            .map(|account| Self {
                asset: asset.clone(),
                payee: account.clone(),
                shares: ledger.shares(account).unwrap_or_default(),
                total_shares: ledger.total_shares(),
                released: ledger.released(asset, account),
            })
            .collect()
    }

    /// Fraction of total shares held, zero when there are no shares.
    pub fn share(&self) -> Decimal {
        if self.total_shares == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.shares) / Decimal::from(self.total_shares)
    }
}

impl Serialize for PayeeStatement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("PayeeStatement", 5)?;
        state.serialize_field("asset", &self.asset.to_string())?;
        state.serialize_field("payee", &self.payee)?;
        state.serialize_field("shares", &self.shares)?;
        state.serialize_field(
            "share",
            &self.share().round_dp(PayeeStatement::DECIMAL_PRECISION),
        )?;
        // Amounts go out as strings; not every format carries u128.
        state.serialize_field("released", &self.released.to_string())?;
        state.end()
    }
}
