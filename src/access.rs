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

//! Authorization.
//!
//! Every state-changing entry point of the [`Splitter`](crate::Splitter)
//! asks an [`AccessGate`] before acting. [`RoleGate`] grants everything to
//! an administrator set and, depending on its [`Posture`], lets anyone pull
//! a single payee's share.

use crate::base::{AccountId, Asset};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A state-changing action together with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    AddPayee { account: &'a AccountId },
    RemovePayee { account: &'a AccountId },
    TrackAsset { asset: &'a Asset },
    /// Release to every current payee.
    Release { asset: &'a Asset },
    /// Release to one payee only.
    ReleasePayee { asset: &'a Asset, payee: &'a AccountId },
}

/// Decides whether `caller` may perform `action`.
pub trait AccessGate {
    fn is_authorized(&self, caller: &AccountId, action: Action<'_>) -> bool;
}

impl<T: AccessGate + ?Sized> AccessGate for Arc<T> {
    fn is_authorized(&self, caller: &AccountId, action: Action<'_>) -> bool {
        (**self).is_authorized(caller, action)
    }
}

/// Who may trigger releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Posture {
    /// Administrators only, for every action.
    #[default]
    Strict,
    /// Anyone may release to a specific payee; everything else stays
    /// administrator-gated.
    OpenPayeeRelease,
}

/// Administrator role set with a configurable release posture.
#[derive(Debug)]
pub struct RoleGate {
    posture: Posture,
    admins: DashSet<AccountId>,
}

impl RoleGate {
    pub fn new(posture: Posture) -> Self {
        Self {
            posture,
            admins: DashSet::new(),
        }
    }

    pub fn with_admins(posture: Posture, admins: impl IntoIterator<Item = AccountId>) -> Self {
        let gate = Self::new(posture);
        for admin in admins {
            gate.grant_admin(admin);
        }
        gate
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    /// Returns `false` if `account` already held the role.
    pub fn grant_admin(&self, account: AccountId) -> bool {
        self.admins.insert(account)
    }

    /// Returns `false` if `account` did not hold the role.
    pub fn revoke_admin(&self, account: &AccountId) -> bool {
        self.admins.remove(account).is_some()
    }

    pub fn is_admin(&self, account: &AccountId) -> bool {
        self.admins.contains(account)
    }
}

impl AccessGate for RoleGate {
    fn is_authorized(&self, caller: &AccountId, action: Action<'_>) -> bool {
        if self.is_admin(caller) {
            return true;
        }
        matches!(
            (self.posture, action),
            (Posture::OpenPayeeRelease, Action::ReleasePayee { .. })
        )
    }
}
