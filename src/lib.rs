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

//! # Payment Splitter
//!
//! This library provides a proportional distribution ledger: it splits the
//! native and token balances held by a shared account among share-weighted
//! payees, so that each payee's cumulative payout tracks its share of the
//! cumulative inflow, whenever and however often releases are triggered.
//!
//! ## Core Components
//!
//! - [`ShareLedger`]: Ordered payee set, share weights and release counters
//! - [`Splitter`]: Distribution engine exposing every release mode
//! - [`AssetAccount`]: Custody seam, with the in-memory [`Vault`]
//! - [`AccessGate`]: Authorization seam, with the role-based [`RoleGate`]
//! - [`SplitterError`]: Error types for rejected calls
//!
//! ## Example
//!
//! ```
//! use payment_splitter::{AccountId, Asset, Posture, RoleGate, Splitter, Vault};
//! use std::sync::Arc;
//!
//! let admin = AccountId::from("admin");
//! let vault = Arc::new(Vault::new(AccountId::from("splitter")));
//! let gate = RoleGate::with_admins(Posture::Strict, [admin.clone()]);
//! let splitter = Splitter::new(gate, Arc::clone(&vault));
//!
//! splitter.add_payee(&admin, AccountId::from("alice"), 75).unwrap();
//! splitter.add_payee(&admin, AccountId::from("bob"), 25).unwrap();
//!
//! // Funds arrive, then get released to everyone.
//! vault.deposit(&Asset::Native, 100);
//! splitter.release(&admin).unwrap();
//!
//! assert_eq!(splitter.released(&Asset::Native, &AccountId::from("alice")), 75);
//! assert_eq!(splitter.released(&Asset::Native, &AccountId::from("bob")), 25);
//! ```
//!
//! ## Thread Safety
//!
//! Each splitter serializes its state-changing calls behind a single
//! re-entrant lock, so it can be shared across threads while behaving like
//! a single-writer ledger.

pub mod access;
mod base;
pub mod config;
pub mod custody;
mod engine;
pub mod error;
mod event;
pub mod ledger;
pub mod registry;
mod statement;

pub use access::{AccessGate, Action, Posture, RoleGate};
pub use base::{AccountId, Amount, Asset, ParseAssetError, Shares};
pub use config::SplitterConfig;
pub use custody::{AssetAccount, Vault};
pub use engine::{Payout, Splitter};
pub use error::{SplitterError, TransferError};
pub use event::{Event, EventJournal};
pub use ledger::{Payee, ShareLedger, mul_div_floor};
pub use registry::{OwnershipRegistry, share_table};
pub use statement::PayeeStatement;
