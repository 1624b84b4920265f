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

//! Core identifier types for accounts and assets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quantity of an asset in its smallest denomination.
pub type Amount = u128;

/// Integer weight of a payee.
pub type Shares = u64;

/// Identifier of an account that can hold assets or act as a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An asset whose balance can be distributed.
///
/// The native asset is the account currency itself; every token contract
/// address is a separate asset with its own accounting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Native,
    Token(AccountId),
}

impl Asset {
    pub fn token(address: impl Into<AccountId>) -> Self {
        Self::Token(address.into())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(Asset::NATIVE_LABEL),
            Self::Token(address) => write!(f, "{address}"),
        }
    }
}

impl Asset {
    /// Label used for the native asset in text formats.
    pub const NATIVE_LABEL: &'static str = "native";
}

/// Parses `native` (case-insensitive) as [`Asset::Native`]; anything else
/// non-empty is a token address.
impl FromStr for Asset {
    type Err = ParseAssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAssetError);
        }
        if s.eq_ignore_ascii_case(Asset::NATIVE_LABEL) {
            Ok(Self::Native)
        } else {
            Ok(Self::Token(AccountId::from(s)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("asset must be `native` or a token address")]
pub struct ParseAssetError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_native_and_token_assets() {
        assert_eq!("native".parse::<Asset>(), Ok(Asset::Native));
        assert_eq!(" NATIVE ".parse::<Asset>(), Ok(Asset::Native));
        assert_eq!("0xvtho".parse::<Asset>(), Ok(Asset::token("0xvtho")));
        assert_eq!("".parse::<Asset>(), Err(ParseAssetError));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for asset in [Asset::Native, Asset::token("0xvtho")] {
            assert_eq!(asset.to_string().parse::<Asset>(), Ok(asset));
        }
    }
}
