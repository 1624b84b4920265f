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

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use payment_splitter::{
    AccountId, Amount, Asset, AssetAccount, Posture, RoleGate, Shares, Splitter, Vault,
};
use std::sync::Arc;

pub const ADMIN: &str = "admin";
pub const HOLDER: &str = "splitter";
pub const VTHO: &str = "0xvtho";

pub type TestSplitter = Splitter<RoleGate, Arc<Vault>>;

pub fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

pub fn admin() -> AccountId {
    account(ADMIN)
}

pub fn vtho() -> Asset {
    Asset::token(VTHO)
}

pub struct Fixture {
    pub vault: Arc<Vault>,
    pub splitter: TestSplitter,
}

impl Fixture {
    pub fn new(posture: Posture) -> Self {
        let vault = Arc::new(Vault::new(account(HOLDER)));
        let gate = RoleGate::with_admins(posture, [admin()]);
        let splitter = Splitter::new(gate, Arc::clone(&vault));
        Self { vault, splitter }
    }

    pub fn strict() -> Self {
        Self::new(Posture::Strict)
    }

    pub fn with_payees(payees: &[(&str, Shares)]) -> Self {
        let fixture = Self::strict();
        fixture.add_payees(payees);
        fixture
    }

    pub fn add_payees(&self, payees: &[(&str, Shares)]) {
        for (name, shares) in payees {
            self.splitter
                .add_payee(&admin(), account(name), *shares)
                .unwrap();
        }
    }

    pub fn deposit(&self, asset: &Asset, amount: Amount) {
        self.vault.deposit(asset, amount);
    }

    /// Balance the splitter still holds.
    pub fn held(&self, asset: &Asset) -> Amount {
        self.vault.balance_of(asset, self.vault.holder())
    }

    /// Balance a payee has received in its own account.
    pub fn balance(&self, asset: &Asset, name: &str) -> Amount {
        self.vault.balance_of(asset, &account(name))
    }
}
