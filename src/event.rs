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

//! Ledger event journal.
//!
//! Provides a concurrent, append-only record of payee and payment events in
//! the order they took effect.

use crate::base::{AccountId, Amount, Asset, Shares};
use crossbeam::queue::SegQueue;
use serde::Serialize;

/// Something that changed the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    PayeeAdded {
        account: AccountId,
        shares: Shares,
    },
    PayeeRemoved {
        account: AccountId,
        shares: Shares,
    },
    PaymentReleased {
        asset: Asset,
        payee: AccountId,
        amount: Amount,
    },
}

/// FIFO journal of [`Event`]s.
///
/// Backed by a [`SegQueue`], so recording never blocks the writer holding
/// the ledger lock.
#[derive(Debug, Default)]
pub struct EventJournal {
    events: SegQueue<Event>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self {
            events: SegQueue::new(),
        }
    }

    pub fn record(&self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes and returns every recorded event, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        let mut drained = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        drained
    }
}
