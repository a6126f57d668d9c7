/// Per-account token records, keyed by case-folded denom. Each balance
/// category owns one field of a token and only ever adds to it.
pub mod account;

/// Bech32 re-encoding of configured keys and validator operator addresses.
pub mod address;

/// Merges category responses into an account's tokens.
pub mod aggregator;

/// Wire amount to display amount conversion.
pub mod amount;

/// Cosmos SDK REST queries, behind a [`api::Transport`] so tests can fake the network.
pub mod api;

pub mod config;

/// Denom to symbol and exponent resolution, asset list first, bank metadata second.
pub mod denom;

/// Chain preparation and the per-account loader steps.
///
/// NOTE: accounts are loaded sequentially. Chain-level state is frozen
/// before the first account, so loading accounts in parallel would only
/// need a transport that is `Sync`.
pub mod snapshot;

/// Bootstraps the library for the binary: runs every chain and renders
/// the result. Kept here so the integration tests can use it too.
pub mod bin_utils;
