use std::{cell::RefCell, collections::HashMap, rc::Rc, str::from_utf8};

use stake_snapshot::{
    account::Account,
    address::{encode, valoper_address},
    api::{ApiError, Transport},
    bin_utils::{OutputFormat, Service},
    config::Config,
    snapshot::StepError,
};

const REST: &str = "http://lcd.test";
const REGISTRY: &str = "http://registry.test";

const CONFIG: &str = r#"
[http]
timeout_secs = 5
registry_url = "http://registry.test"

[[chains]]
id = "cosmoshub-4"
registry_name = "cosmoshub"
rest = "http://lcd.test"
bech32_prefix = "cosmos"
bond_denom = "uatom"
accounts = ["alice", "bob"]

[[chains]]
id = "broken-1"
rest = "http://broken.test"
accounts = ["alice"]

[[accounts]]
name = "alice"
address = "0101010101010101010101010101010101010101"

[[accounts]]
name = "bob"
address = "0202020202020202020202020202020202020202"
"#;

/// Serves canned bodies by exact URL, everything else answers 404.
#[derive(Default)]
struct CannedTransport {
    routes: HashMap<String, (u16, String)>,
}

impl CannedTransport {
    fn with(mut self, path: &str, body: &str) -> Self {
        self.routes.insert(path.to_owned(), (200, body.to_owned()));
        self
    }

    fn with_status(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes.insert(path.to_owned(), (status, body.to_owned()));
        self
    }
}

impl Transport for CannedTransport {
    fn get(&self, url: &str) -> Result<String, ApiError> {
        match self.routes.get(url) {
            Some((200, body)) => Ok(body.clone()),
            Some((status, body)) => Err(ApiError::Status {
                url: url.to_owned(),
                status: *status,
                body: body.clone(),
            }),
            None => Err(ApiError::Status {
                url: url.to_owned(),
                status: 404,
                body: "not found".to_owned(),
            }),
        }
    }
}

fn transport(alice: &str) -> CannedTransport {
    let alice_valoper = valoper_address(alice).unwrap();
    CannedTransport::default()
        .with(
            &format!("{REST}/cosmos/base/tendermint/v1beta1/blocks/latest"),
            r#"{"block":{"header":{"chain_id":"cosmoshub-4","height":"19000000","time":"2024-01-02T03:04:05Z"}}}"#,
        )
        .with(
            &format!("{REGISTRY}/cosmoshub/assetlist"),
            r#"{"chain_name":"cosmoshub","assets":[{"base":"uatom","display":"atom","symbol":"ATOM",
                "denom_units":[{"denom":"uatom","exponent":0},{"denom":"atom","exponent":6}]}]}"#,
        )
        .with(
            &format!("{REST}/cosmos/bank/v1beta1/denoms_metadata/ibc/ABC"),
            r#"{"metadata":{"base":"ibc/ABC","display":"osmo",
                "denom_units":[{"denom":"uosmo","exponent":0},{"denom":"osmo","exponent":6}]}}"#,
        )
        .with(
            &format!("{REST}/cosmos/bank/v1beta1/balances/{alice}"),
            r#"{"balances":[
                {"denom":"uatom","amount":"1000000"},
                {"denom":"gamm/pool/1","amount":"500"},
                {"denom":"ibc/ABC","amount":"3000000"}
            ],"pagination":{"next_key":null,"total":"3"}}"#,
        )
        .with(
            &format!("{REST}/cosmos/distribution/v1beta1/delegators/{alice}/rewards"),
            r#"{"rewards":[],"total":[{"denom":"uatom","amount":"500000.000000000000000000"}]}"#,
        )
        .with_status(
            &format!("{REST}/cosmos/distribution/v1beta1/validators/{alice_valoper}/commission"),
            400,
            r#"{"code":3,"message":"validator does not exist"}"#,
        )
        .with(
            &format!("{REST}/cosmos/staking/v1beta1/delegations/{alice}"),
            r#"{"delegation_responses":[{"delegation":{"validator_address":"cosmosvaloper1x"},
                "balance":{"denom":"uatom","amount":"2000000"}}]}"#,
        )
        .with(
            &format!("{REST}/cosmos/staking/v1beta1/delegators/{alice}/unbonding_delegations"),
            r#"{"unbonding_responses":[{"entries":[
                {"creation_height":"1","completion_time":"2024-01-20T00:00:00Z","initial_balance":"250000","balance":"250000"}
            ]}]}"#,
        )
}

#[test]
fn snapshot_accounts_to_csv() {
    let alice = encode("cosmos", &[1; 20]).unwrap();
    let bob = encode("cosmos", &[2; 20]).unwrap();
    let config: Config = CONFIG.parse().unwrap();

    let errors = Rc::new(RefCell::new(Vec::new()));
    let collected = errors.clone();
    let mut output = Vec::new();
    let service = Service {
        config,
        transport: transport(&alice),
        output: &mut output,
        format: OutputFormat::Csv,
        error_printer: Box::new(move |chain: &str, account: &Account, err: &StepError| {
            collected
                .borrow_mut()
                .push(format!("{chain}/{}: {err}", account.name));
        }),
    };
    let snapshots = service.run().unwrap();

    // the chain without a resolvable prefix is left out
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].context.id, "cosmoshub-4");

    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    let stamp = "cosmoshub-4,19000000,2024-01-02T03:04:05+00:00";
    assert_eq!(
        lines,
        vec![
            "account_name,account_address,chain_id,block_height,block_time,token,denom,bank,rewards,staked,unbonding,commission,original_vesting,delegated_vesting,locked_vesting,total".to_string(),
            format!("alice,{alice},{stamp},OSMO (IBC),ibc/ABC,3,0,0,0,0,0,0,0,3"),
            format!("alice,{alice},{stamp},ATOM,uatom,1,0.5,2,0.25,0,0,0,0,3.75"),
            format!("bob,{bob},{stamp},na,na,na,na,na,na,na,na,na,na,na"),
        ]
    );

    // bob is known to nobody: every query but the vesting one is reported
    let errors = errors.borrow();
    assert_eq!(errors.len(), 5);
    assert!(errors.iter().all(|err| err.starts_with("cosmoshub-4/bob: ")));
}

#[test]
fn snapshot_accounts_to_table() {
    let alice = encode("cosmos", &[1; 20]).unwrap();
    let config: Config = CONFIG.parse().unwrap();

    let mut output = Vec::new();
    let service = Service {
        config,
        transport: transport(&alice),
        output: &mut output,
        format: OutputFormat::Table,
        error_printer: Box::new(|_: &str, _: &Account, _: &StepError| {}),
    };
    service.run().unwrap();

    let text = from_utf8(&output).unwrap();
    assert!(text.starts_with("ACCOUNTS - DETAILS\n"));
    assert!(text.contains("OSMO (IBC)"));
    assert!(text.contains("3.75"));
    assert!(!text.contains("gamm"));
    assert!(text.ends_with("Retrieved information for 2 accounts\n"));
}
