use ghost_wallet_hunter::core::{Config, WalletAddress};
use ghost_wallet_hunter::detective::PersonaId;
use ghost_wallet_hunter::GhostWalletHunter;
use tracing::info;

/// Thin CLI demo: `ghost_wallet_hunter <address> [persona_id]`. With no
/// persona, runs the full seven-agent comprehensive investigation; with one,
/// runs just that agent. Seeds for taint/evidence/flow/influence are not
/// wired up here (no CLI surface for them), so those stages stay disabled.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    ghost_wallet_hunter::metrics::init_metrics();

    let address_arg = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: ghost_wallet_hunter <wallet_address> [persona_id]"))?;

    let wallet = WalletAddress::parse(&address_arg)?;
    let config = Config::from_env();
    info!(rpc_url = %config.rpc_url, "starting investigation");
    let hunter = GhostWalletHunter::new(config);

    match std::env::args().nth(2) {
        Some(agent) => {
            let persona = parse_persona(&agent).ok_or_else(|| anyhow::anyhow!("unknown persona id: {agent}"))?;
            let record = hunter.run_single_agent(&wallet, persona, &[]).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => {
            let investigation = hunter.run_comprehensive_investigation(&wallet, &[]).await?;
            println!("{}", serde_json::to_string_pretty(&investigation)?);
        }
    }

    Ok(())
}

fn parse_persona(id: &str) -> Option<PersonaId> {
    PersonaId::ALL.into_iter().find(|p| p.id() == id)
}
