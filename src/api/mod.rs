use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{trace, warn};
use url::form_urlencoded::byte_serialize;

use model::{
    AssetList, AuthAccountResponse, BalancesResponse, Bech32PrefixResponse, CommissionResponse,
    DelegationsResponse, DenomMetadataResponse, LatestBlockResponse, RewardsResponse,
    StakingParamsResponse, UnbondingsResponse,
};

pub mod model;

#[cfg(test)]
pub(crate) mod testing;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REGISTRY_URL: &str = "https://chains.cosmos.directory";

/// Upper bound on pages followed for a single paginated query.
const MAX_PAGES: usize = 100;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to `{url}` failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("Request to `{url}` returned status {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Cannot decode response from `{url}`: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body returned with a non-success status, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// A single HTTP GET. Non-success statuses are errors that still carry the
/// response body, so callers can inspect what the node said.
pub trait Transport {
    fn get(&self, url: &str) -> Result<String, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<String, ApiError> {
        (**self).get(url)
    }
}

/// Blocking reqwest client shared by every query of a run.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stake-snapshot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ApiError::Transport {
                url: String::new(),
                reason: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String, ApiError> {
        let transport_err = |err: reqwest::Error| ApiError::Transport {
            url: url.to_owned(),
            reason: err.to_string(),
        };
        let response = self.client.get(url).send().map_err(transport_err)?;
        let status = response.status();
        let body = response.text().map_err(transport_err)?;
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn get_json<T, R>(transport: &T, url: &str) -> Result<R, ApiError>
where
    T: Transport + ?Sized,
    R: DeserializeOwned,
{
    trace!("GET {url}");
    let body = transport.get(url)?;
    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        url: url.to_owned(),
        source,
    })
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Which form of the bank denom-metadata endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataLookup<'a> {
    Path(&'a str),
    QueryString(&'a str),
}

impl<'a> MetadataLookup<'a> {
    /// Token-factory denoms contain slashes that some nodes only accept as a
    /// query parameter.
    pub fn for_denom(denom: &'a str) -> Self {
        if denom.to_lowercase().starts_with("factory/") {
            MetadataLookup::QueryString(denom)
        } else {
            MetadataLookup::Path(denom)
        }
    }
}

/// Typed queries against one chain's REST endpoint.
pub struct LcdClient<'t, T: ?Sized> {
    transport: &'t T,
    rest: String,
}

impl<'t, T> LcdClient<'t, T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: &'t T, rest: &str) -> Self {
        Self {
            transport,
            rest: rest.trim_end_matches('/').to_owned(),
        }
    }

    fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        get_json(self.transport, &format!("{}{path}", self.rest))
    }

    /// Follows `pagination.next_key` until the node reports no further pages.
    fn get_paged<R, F>(&self, path: &str, next_key: F) -> Result<Vec<R>, ApiError>
    where
        R: DeserializeOwned,
        F: Fn(&R) -> Option<String>,
    {
        let mut pages = Vec::new();
        let mut key: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let page: R = match &key {
                None => self.get(path)?,
                Some(key) => self.get(&format!("{path}?pagination.key={}", encode(key)))?,
            };
            key = next_key(&page).filter(|k| !k.is_empty());
            pages.push(page);
            if key.is_none() {
                return Ok(pages);
            }
        }
        warn!("Stopped following `{path}` after {MAX_PAGES} pages, result is partial");
        Ok(pages)
    }

    pub fn bech32_prefix(&self) -> Result<Bech32PrefixResponse, ApiError> {
        self.get("/cosmos/auth/v1beta1/bech32")
    }

    pub fn auth_account(&self, address: &str) -> Result<AuthAccountResponse, ApiError> {
        self.get(&format!("/cosmos/auth/v1beta1/accounts/{address}"))
    }

    pub fn balances(&self, address: &str) -> Result<Vec<BalancesResponse>, ApiError> {
        self.get_paged(
            &format!("/cosmos/bank/v1beta1/balances/{address}"),
            |page: &BalancesResponse| page.pagination.as_ref().and_then(|p| p.next_key.clone()),
        )
    }

    pub fn denom_metadata(
        &self,
        lookup: MetadataLookup<'_>,
    ) -> Result<DenomMetadataResponse, ApiError> {
        match lookup {
            MetadataLookup::Path(denom) => {
                self.get(&format!("/cosmos/bank/v1beta1/denoms_metadata/{denom}"))
            }
            MetadataLookup::QueryString(denom) => self.get(&format!(
                "/cosmos/bank/v1beta1/denoms_metadata_by_query_string?denom={}",
                encode(denom)
            )),
        }
    }

    pub fn rewards(&self, address: &str) -> Result<RewardsResponse, ApiError> {
        self.get(&format!(
            "/cosmos/distribution/v1beta1/delegators/{address}/rewards"
        ))
    }

    pub fn commission(&self, valoper: &str) -> Result<CommissionResponse, ApiError> {
        self.get(&format!(
            "/cosmos/distribution/v1beta1/validators/{valoper}/commission"
        ))
    }

    pub fn delegations(&self, address: &str) -> Result<Vec<DelegationsResponse>, ApiError> {
        self.get_paged(
            &format!("/cosmos/staking/v1beta1/delegations/{address}"),
            |page: &DelegationsResponse| page.pagination.as_ref().and_then(|p| p.next_key.clone()),
        )
    }

    pub fn unbondings(&self, address: &str) -> Result<Vec<UnbondingsResponse>, ApiError> {
        self.get_paged(
            &format!("/cosmos/staking/v1beta1/delegators/{address}/unbonding_delegations"),
            |page: &UnbondingsResponse| page.pagination.as_ref().and_then(|p| p.next_key.clone()),
        )
    }

    pub fn staking_params(&self) -> Result<StakingParamsResponse, ApiError> {
        self.get("/cosmos/staking/v1beta1/params")
    }

    pub fn latest_block(&self) -> Result<LatestBlockResponse, ApiError> {
        self.get("/cosmos/base/tendermint/v1beta1/blocks/latest")
    }
}

/// Fetches a chain's asset list from the chain registry.
pub fn fetch_asset_list<T>(
    transport: &T,
    registry_url: &str,
    chain_name: &str,
) -> Result<AssetList, ApiError>
where
    T: Transport + ?Sized,
{
    get_json(
        transport,
        &format!(
            "{}/{chain_name}/assetlist",
            registry_url.trim_end_matches('/')
        ),
    )
}
