use std::sync::Arc;
use std::time::Duration;
use ethers::types::Address;
use honeypot_probe::blockchain::{BlockchainClient, EvmRouter, ForkDB};
use honeypot_probe::{CheckKind, RouterAdapter, SimulationRunner, ToleranceParameter};

const RPC_URL: &str = "https://rpc.pulsechain.com";

fn address(value: &str) -> Address {
    value.parse().unwrap()
}

#[tokio::test]
#[ignore = "requires RPC access"]
async fn test_fork_db_reads_live_state() {
    let client = Arc::new(BlockchainClient::new(RPC_URL).await.expect("Failed to connect"));
    let block = client.block_context().await.expect("Failed to fetch block");

    // WPLS
    let wpls = address("0xA1077a294dDE1B09bB078844df40758a5D0f9a27");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    let db = ForkDB::new(client, block.number, deadline).expect("Failed to create ForkDB");

    let balance = tokio::task::spawn_blocking(move || {
        let mut router = EvmRouter::new(db, &block);
        router.native_balance(wpls)
    })
    .await
    .unwrap()
    .expect("Failed to fetch account");

    println!("WPLS native balance: {}", balance);
}

#[tokio::test]
#[ignore = "requires RPC access"]
async fn test_screen_wrapped_native_pair_on_chain() {
    let client = Arc::new(BlockchainClient::new(RPC_URL).await.expect("Failed to connect"));

    // PulseX V2 router and PLSX
    let router = address("0x165C3410fC91EF562C50559f7d2289fEbed552d9");
    let plsx = address("0x95B303987A60C71504D99Aa1b13B4DA07b0790ab");

    let report = SimulationRunner::default()
        .with_timeout(Duration::from_secs(60))
        .screen_on_chain(
            client,
            router,
            plsx,
            CheckKind::Tolerance,
            ToleranceParameter::from_ether_str("0.05").unwrap().raw(),
        )
        .await
        .expect("caller error");

    println!("{}", report);
    assert!(report.outcome.is_pass(), "{}", report);
}
