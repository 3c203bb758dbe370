//! Helpers for parsing event data back into well typed values.

use anyhow::Context;
use cosmwasm_std::{Addr, Decimal, Event, Timestamp, Uint128};
use serde::de::DeserializeOwned;
use std::str::FromStr;

/// Extension trait to read typed attributes out of native cosmwasm events.
pub trait PlatformEventExt {
    /// Does the event have the given attribute?
    fn has_attr(&self, key: &str) -> bool;

    /// Parse the value associated with the key, if it exists
    fn try_map_attr<B>(&self, key: &str, f: impl Fn(&str) -> B) -> Option<B>;

    /// Parse the value associated with the key
    fn map_attr_result<B>(&self, key: &str, f: impl Fn(&str) -> anyhow::Result<B>) -> anyhow::Result<B> {
        self.try_map_attr(key, |s| f(s))
            .with_context(|| format!("no attribute {key}"))?
    }

    /// Read a raw string attribute
    fn string_attr(&self, key: &str) -> anyhow::Result<String> {
        self.map_attr_result(key, |s| Ok(s.to_owned()))
    }

    /// Read an address attribute without api validation
    fn unchecked_addr_attr(&self, key: &str) -> anyhow::Result<Addr> {
        self.map_attr_result(key, |s| Ok(Addr::unchecked(s)))
    }

    /// Read a `u64` attribute
    fn u64_attr(&self, key: &str) -> anyhow::Result<u64> {
        self.map_attr_result(key, |s| s.parse().map_err(anyhow::Error::from))
    }

    /// Read a [Uint128] attribute
    fn amount_attr(&self, key: &str) -> anyhow::Result<Uint128> {
        self.map_attr_result(key, |s| {
            s.parse::<u128>()
                .map(Uint128::new)
                .map_err(anyhow::Error::from)
        })
    }

    /// Read a [Decimal] attribute
    fn decimal_attr(&self, key: &str) -> anyhow::Result<Decimal> {
        self.map_attr_result(key, |s| Decimal::from_str(s).map_err(anyhow::Error::from))
    }

    /// Read a timestamp attribute stored as nanoseconds
    fn timestamp_attr(&self, key: &str) -> anyhow::Result<Timestamp> {
        self.map_attr_result(key, |s| {
            s.parse::<u64>()
                .map(Timestamp::from_nanos)
                .map_err(anyhow::Error::from)
        })
    }

    /// Read a JSON attribute
    fn json_attr<B: DeserializeOwned>(&self, key: &str) -> anyhow::Result<B> {
        self.map_attr_result(key, |s| serde_json::from_str(s).map_err(anyhow::Error::from))
    }
}

impl PlatformEventExt for Event {
    fn has_attr(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a.key == key)
    }

    fn try_map_attr<B>(&self, key: &str, f: impl Fn(&str) -> B) -> Option<B> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| f(&a.value))
    }
}
