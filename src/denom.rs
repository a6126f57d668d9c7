use std::collections::HashMap;

use tracing::debug;

use crate::api::{
    LcdClient, MetadataLookup, Transport,
    model::{AssetList, DenomMetadata, DenomUnit},
};

/// Exponent assumed when neither the asset list nor the bank module know a denom.
pub const DEFAULT_EXPONENT: u32 = 6;

pub const IBC_SUFFIX: &str = " (IBC)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenomInfo {
    pub symbol: String,
    pub exponent: u32,
}

pub fn is_ibc(denom: &str) -> bool {
    has_prefix(denom, "ibc/")
}

pub(crate) fn has_prefix(denom: &str, prefix: &str) -> bool {
    denom
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// The unit named by `display`. A zero exponent does not count as a match,
/// and the first unit of the list is never used as a fallback.
fn display_unit<'u>(units: &'u [DenomUnit], display: &str) -> Option<&'u DenomUnit> {
    units
        .iter()
        .find(|unit| unit.denom.eq_ignore_ascii_case(display) && unit.exponent != 0)
}

impl AssetList {
    /// Symbol and display exponent for the asset whose base is exactly `denom`.
    pub fn lookup(&self, denom: &str) -> Option<DenomInfo> {
        self.assets
            .iter()
            .filter(|asset| asset.base == denom)
            .find_map(|asset| {
                display_unit(&asset.denom_units, &asset.display).map(|unit| DenomInfo {
                    symbol: asset.symbol.clone(),
                    exponent: unit.exponent,
                })
            })
    }
}

impl DenomMetadata {
    fn denom_info(&self, denom: &str) -> DenomInfo {
        if self.base.is_empty() {
            // assume a one-letter minor unit prefix, e.g. `uatom`
            return DenomInfo {
                symbol: denom.chars().skip(1).collect::<String>().to_uppercase(),
                exponent: DEFAULT_EXPONENT,
            };
        }
        DenomInfo {
            symbol: self.display.to_uppercase(),
            exponent: display_unit(&self.denom_units, &self.display)
                .map(|unit| unit.exponent)
                .unwrap_or(0),
        }
    }
}

/// Resolves wire denoms to display symbols and exponents for one chain.
///
/// The chain's asset list is consulted first; the bank module's denom
/// metadata is the fallback. Resolution never fails, it degrades to
/// defaults. Results are memoised for the lifetime of the resolver.
pub struct DenomResolver<'a, T: ?Sized> {
    lcd: &'a LcdClient<'a, T>,
    assets: Option<&'a AssetList>,
    resolved: HashMap<String, DenomInfo>,
}

impl<'a, T> DenomResolver<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(lcd: &'a LcdClient<'a, T>, assets: Option<&'a AssetList>) -> Self {
        Self {
            lcd,
            assets,
            resolved: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, denom: &str) -> DenomInfo {
        if let Some(info) = self.resolved.get(denom) {
            return info.clone();
        }
        let info = self.resolve_uncached(denom);
        self.resolved.insert(denom.to_owned(), info.clone());
        info
    }

    fn resolve_uncached(&self, denom: &str) -> DenomInfo {
        let mut info = self
            .assets
            .and_then(|assets| assets.lookup(denom))
            .unwrap_or_else(|| self.from_bank_metadata(denom));
        if is_ibc(denom) {
            info.symbol.push_str(IBC_SUFFIX);
        }
        info
    }

    fn from_bank_metadata(&self, denom: &str) -> DenomInfo {
        let metadata = match self.lcd.denom_metadata(MetadataLookup::for_denom(denom)) {
            Ok(resp) => resp.metadata,
            Err(err) => {
                debug!("No bank metadata for `{denom}`, using defaults: {err}");
                DenomMetadata::default()
            }
        };
        metadata.denom_info(denom)
    }
}
