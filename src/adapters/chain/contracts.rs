//! Battle Contract Bindings - LedgerClient over alloy-rs
//!
//! Implements the `LedgerClient` port against the deployed battle
//! contract. The contract address comes from `config.toml` and is
//! validated on-chain at startup (code existence), preventing
//! configuration errors from causing silent failures at runtime.
//!
//! Every RPC round trip is bounded by the configured call timeout;
//! contract revert reasons are classified into the port's typed
//! rejection taxonomy so usecases never parse error strings.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, instrument};

use crate::config::LedgerConfig;
use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::battle::{BattleId, Track};
use crate::ports::ledger::{
    BattleDetails, CloseOutcome, LedgerClient, LedgerError, LedgerEvent, RejectReason,
    TrackTally, TxReceipt, TxSpec,
};

use super::provider::EvmProvider;

sol! {
    #[sol(rpc)]
    interface IMusicBattle {
        event BattleCreated(uint256 indexed battleId);
        event VoteCast(uint256 indexed battleId, address indexed voter);

        function createBattle(
            string track1,
            string track2,
            address creator1,
            address creator2
        ) payable returns (uint256 battleId);

        function vote(
            uint256 battleId,
            uint8 trackNumber,
            address voter,
            uint256 payment
        ) payable;

        function battleVoters(uint256 battleId, address voter)
            view returns (bool voted);

        function getBattleDetails(uint256 battleId)
            view returns (
                string track1,
                string track2,
                uint256 votesTrack1,
                uint256 votesTrack2,
                uint256 timestamp,
                bool isActive,
                uint256 winner
            );

        function getBattleVotes(uint256 battleId)
            view returns (uint256 track1Votes, uint256 track2Votes);

        function getTotalVoters(uint256 battleId)
            view returns (uint256 total);

        function votersList(uint256 battleId)
            view returns (address[] voters);

        function getSpecificTrackVoters(uint256 track, uint256 battleId)
            view returns (address[] voters);

        function closeBattle(uint256 battleId)
            returns (uint256 result, string message);

        function getBalance() view returns (uint256 balance);

        function transferFundsFromContractToOwner(uint256 amount, address recipient);
    }
}

/// `LedgerClient` implementation over the deployed battle contract.
pub struct BattleLedger {
    /// Shared ledger RPC provider.
    provider: Arc<EvmProvider>,
    /// Deployed battle contract address.
    contract_address: alloy::primitives::Address,
    /// Per-call deadline.
    call_timeout: Duration,
}

impl BattleLedger {
    /// Create and validate the contract binding.
    ///
    /// Fails hard if the configured address has no deployed code.
    #[instrument(skip_all)]
    pub async fn new(provider: Arc<EvmProvider>, config: &LedgerConfig) -> Result<Self> {
        let contract_address: alloy::primitives::Address = config
            .contract_address
            .parse()
            .context("Invalid battle contract address")?;

        let code = provider
            .inner()
            .get_code_at(contract_address)
            .await
            .context("Failed to query code for battle contract")?;

        if code.is_empty() {
            bail!(
                "Battle contract at {contract_address} has no deployed code — check config.toml"
            );
        }

        info!(address = %contract_address, "Battle contract validated on-chain");

        Ok(Self {
            provider,
            contract_address,
            call_timeout: Duration::from_millis(config.call_timeout_ms),
        })
    }

    /// Bound a ledger round trip by the configured deadline.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, LedgerError>
    where
        F: std::future::Future<Output = Result<T, LedgerError>>,
    {
        match timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout),
        }
    }

    fn wei(value: Amount) -> Result<U256, LedgerError> {
        value
            .to_wei()
            .map(U256::from)
            .ok_or_else(|| {
                LedgerError::Rejected(RejectReason::Other(format!(
                    "amount {value} is not representable in wei"
                )))
            })
    }
}

/// Classify an RPC/contract fault into the port taxonomy.
///
/// Revert reasons carry the contract's own wording; anything that is
/// not recognizably a contract rejection is a transport fault.
fn classify_fault(err: impl std::fmt::Display) -> LedgerError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("already voted") {
        LedgerError::Rejected(RejectReason::DuplicateVote)
    } else if lower.contains("period has ended") || lower.contains("battle has stopped") {
        LedgerError::Rejected(RejectReason::VotingEnded)
    } else if lower.contains("revert") {
        LedgerError::Rejected(RejectReason::Other(msg))
    } else {
        LedgerError::Network(msg)
    }
}

fn parse_evm_address(raw: &str) -> Result<alloy::primitives::Address, LedgerError> {
    raw.parse().map_err(|_| {
        LedgerError::Rejected(RejectReason::Other(format!("malformed address: {raw}")))
    })
}

fn to_domain_address(addr: alloy::primitives::Address) -> Result<Address, LedgerError> {
    format!("{addr:#x}")
        .parse()
        .map_err(|_| LedgerError::Network("ledger returned a malformed address".to_string()))
}

#[async_trait]
impl LedgerClient for BattleLedger {
    #[instrument(skip(self, tx))]
    async fn estimate_cost(&self, tx: &TxSpec, value: Amount) -> Result<u64, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        let attached = Self::wei(value)?;

        self.bounded(async {
            let estimate = match tx {
                TxSpec::CreateBattle {
                    track1,
                    track2,
                    creator1,
                    creator2,
                    ..
                } => {
                    contract
                        .createBattle(
                            track1.clone(),
                            track2.clone(),
                            parse_evm_address(creator1.as_str())?,
                            parse_evm_address(creator2.as_str())?,
                        )
                        .value(attached)
                        .estimate_gas()
                        .await
                }
                TxSpec::CastVote {
                    battle_id,
                    track,
                    voter,
                } => {
                    contract
                        .vote(
                            U256::from(battle_id.0),
                            track.number(),
                            parse_evm_address(voter.as_str())?,
                            attached,
                        )
                        .value(attached)
                        .estimate_gas()
                        .await
                }
                TxSpec::Withdraw { recipient, .. } => {
                    contract
                        .transferFundsFromContractToOwner(
                            attached,
                            parse_evm_address(recipient.as_str())?,
                        )
                        .estimate_gas()
                        .await
                }
            };
            estimate.map_err(classify_fault)
        })
        .await
    }

    #[instrument(skip(self, tx))]
    async fn submit(&self, tx: TxSpec, value: Amount) -> Result<TxReceipt, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        let attached = Self::wei(value)?;

        self.bounded(async {
            let pending = match &tx {
                TxSpec::CreateBattle {
                    track1,
                    track2,
                    creator1,
                    creator2,
                    ..
                } => {
                    contract
                        .createBattle(
                            track1.clone(),
                            track2.clone(),
                            parse_evm_address(creator1.as_str())?,
                            parse_evm_address(creator2.as_str())?,
                        )
                        .value(attached)
                        .send()
                        .await
                }
                TxSpec::CastVote {
                    battle_id,
                    track,
                    voter,
                } => {
                    contract
                        .vote(
                            U256::from(battle_id.0),
                            track.number(),
                            parse_evm_address(voter.as_str())?,
                            attached,
                        )
                        .value(attached)
                        .send()
                        .await
                }
                TxSpec::Withdraw { recipient, authorizer } => {
                    // The custodial contract releases funds only to calls
                    // signed by its owner account; the amount rides as a
                    // call argument, nothing is attached.
                    if parse_evm_address(authorizer.as_str())?
                        != self.provider.wallet_address()
                    {
                        return Err(LedgerError::Rejected(RejectReason::Other(
                            "authorizer is not the configured custodial account".to_string(),
                        )));
                    }
                    contract
                        .transferFundsFromContractToOwner(
                            attached,
                            parse_evm_address(recipient.as_str())?,
                        )
                        .send()
                        .await
                }
            };

            let receipt = pending
                .map_err(classify_fault)?
                .get_receipt()
                .await
                .map_err(classify_fault)?;

            let mut events = Vec::new();
            for log in receipt.inner.logs() {
                if let Ok(decoded) = log.log_decode::<IMusicBattle::BattleCreated>() {
                    events.push(LedgerEvent::BattleCreated {
                        battle_id: BattleId(decoded.inner.data.battleId.to::<u64>()),
                    });
                } else if let Ok(decoded) = log.log_decode::<IMusicBattle::VoteCast>() {
                    events.push(LedgerEvent::VoteRecorded {
                        battle_id: BattleId(decoded.inner.data.battleId.to::<u64>()),
                        voter: to_domain_address(decoded.inner.data.voter)?,
                    });
                }
            }

            Ok(TxReceipt {
                tx_ref: format!("{:#x}", receipt.transaction_hash),
                events,
            })
        })
        .await
    }

    async fn has_voted(
        &self,
        battle_id: BattleId,
        voter: &Address,
    ) -> Result<bool, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let voter = parse_evm_address(voter.as_str())?;
            let out = contract
                .battleVoters(U256::from(battle_id.0), voter)
                .call()
                .await
                .map_err(classify_fault)?;
            Ok(out.voted)
        })
        .await
    }

    async fn battle_details(
        &self,
        battle_id: BattleId,
    ) -> Result<BattleDetails, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract
                .getBattleDetails(U256::from(battle_id.0))
                .call()
                .await
                .map_err(classify_fault)?;
            Ok(BattleDetails {
                track1: out.track1,
                track2: out.track2,
                votes_track1: out.votesTrack1.to::<u64>(),
                votes_track2: out.votesTrack2.to::<u64>(),
                created_at_secs: out.timestamp.to::<u64>(),
                is_active: out.isActive,
                winner_code: out.winner.to::<u64>(),
            })
        })
        .await
    }

    async fn tally(&self, battle_id: BattleId) -> Result<TrackTally, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract
                .getBattleVotes(U256::from(battle_id.0))
                .call()
                .await
                .map_err(classify_fault)?;
            Ok(TrackTally {
                track1: out.track1Votes.to::<u64>(),
                track2: out.track2Votes.to::<u64>(),
            })
        })
        .await
    }

    async fn voter_count(&self, battle_id: BattleId) -> Result<u64, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract
                .getTotalVoters(U256::from(battle_id.0))
                .call()
                .await
                .map_err(classify_fault)?;
            Ok(out.total.to::<u64>())
        })
        .await
    }

    async fn voter_list(&self, battle_id: BattleId) -> Result<Vec<Address>, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract
                .votersList(U256::from(battle_id.0))
                .call()
                .await
                .map_err(classify_fault)?;
            out.voters.into_iter().map(to_domain_address).collect()
        })
        .await
    }

    async fn track_voters(
        &self,
        battle_id: BattleId,
        track: Track,
    ) -> Result<Vec<Address>, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract
                .getSpecificTrackVoters(
                    U256::from(track.number()),
                    U256::from(battle_id.0),
                )
                .call()
                .await
                .map_err(classify_fault)?;
            out.voters.into_iter().map(to_domain_address).collect()
        })
        .await
    }

    async fn close_battle(
        &self,
        battle_id: BattleId,
    ) -> Result<CloseOutcome, LedgerError> {
        // The contract finalizes closure internally once the voting
        // window has elapsed; this call surfaces the recorded outcome
        // and is idempotent for already-closed battles.
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract
                .closeBattle(U256::from(battle_id.0))
                .call()
                .await
                .map_err(classify_fault)?;
            Ok(CloseOutcome {
                code: out.result.to::<u64>(),
                message: out.message,
            })
        })
        .await
    }

    async fn custodial_balance(&self) -> Result<Amount, LedgerError> {
        let contract = IMusicBattle::new(self.contract_address, self.provider.inner());
        self.bounded(async {
            let out = contract.getBalance().call().await.map_err(classify_fault)?;
            Ok(Amount::from_wei(out.balance.to::<u128>()))
        })
        .await
    }

    async fn is_healthy(&self) -> bool {
        self.provider.is_healthy().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_duplicate_vote_revert() {
        let fault = classify_fault("execution reverted: You have already voted in this battle.");
        assert!(matches!(
            fault,
            LedgerError::Rejected(RejectReason::DuplicateVote)
        ));
    }

    #[test]
    fn test_classify_period_ended_revert() {
        let fault = classify_fault("execution reverted: Battle voting period has ended");
        assert!(matches!(
            fault,
            LedgerError::Rejected(RejectReason::VotingEnded)
        ));
    }

    #[test]
    fn test_classify_other_revert() {
        let fault = classify_fault("execution reverted: insufficient payment");
        assert!(matches!(
            fault,
            LedgerError::Rejected(RejectReason::Other(_))
        ));
    }

    #[test]
    fn test_classify_transport_fault() {
        let fault = classify_fault("connection refused");
        assert!(matches!(fault, LedgerError::Network(_)));
    }

    #[test]
    fn test_domain_address_round_trip() {
        let evm: alloy::primitives::Address =
            "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let domain = to_domain_address(evm).unwrap();
        assert_eq!(parse_evm_address(domain.as_str()).unwrap(), evm);
    }
}
