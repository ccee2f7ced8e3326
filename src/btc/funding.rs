//! Greedy coin selection.
//!
//! Candidates are consumed strictly in the order given; callers decide
//! priority by sorting before they call in. Every added input is charged
//! the marginal fee of one P2PKH input at the requested rate.

use bitcoin::ScriptBuf;
use tracing::debug;

use crate::btc::fees::FeeRate;
use crate::btc::tx_builder::TxDraft;
use crate::btc::utxo::Utxo;
use crate::error::{Error, Result};

/// Who pays for the inputs the funder adds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// Each added input raises the target by its own fee
    AddInputFees,
    /// The target already includes all fees; inputs are added at face value
    AmountIncludesFees,
}

/// Add inputs from `candidates` to `draft` until `target` is covered.
///
/// Returns the change: consumed value minus the target and, in
/// [`FeeMode::AddInputFees`], minus the fees of the inputs added.
/// Fails with [`Error::NotEnoughFunds`] carrying the amount still missing
/// when candidates run out.
pub fn fund(
    draft: &mut TxDraft,
    candidates: &[Utxo],
    target: u64,
    rate: FeeRate,
    mode: FeeMode,
) -> Result<u64> {
    let input_fee = match mode {
        FeeMode::AddInputFees => draft.fee_at(rate, 1, 0) - draft.fee_at(rate, 0, 0),
        FeeMode::AmountIncludesFees => 0,
    };

    let mut remaining = target;
    for utxo in candidates {
        if mode == FeeMode::AddInputFees && utxo.value <= input_fee {
            debug!(
                txid = %utxo.txid,
                vout = utxo.vout,
                value = utxo.value,
                "skipping UTXO worth less than its input fee"
            );
            continue;
        }

        let needed = remaining + input_fee;
        draft.add_input(utxo);
        if utxo.value >= needed {
            let change = utxo.value - needed;
            debug!(inputs = draft.input_count(), change, "funded transaction");
            return Ok(change);
        }
        remaining = needed - utxo.value;
    }

    Err(Error::NotEnoughFunds { shortfall: remaining })
}

/// Spend policy for value transfers
#[derive(Debug, Clone, Copy)]
pub struct SpendPolicy {
    /// Smallest value the destination may receive
    pub dust_minimum: u64,
    /// How far the request may exceed the balance before it is rejected
    pub overshoot_tolerance: u64,
}

/// Result of funding a value transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendOutcome {
    /// Value delivered to the destination
    pub sent: u64,
    /// Value returned to the payer, zero when no change output was added
    pub change: u64,
    /// Fee paid
    pub fee: u64,
}

/// Fund a transfer whose `amount` includes fees.
///
/// `destination_index` is the output that receives `amount − fee`; it is
/// rewritten once fees are known. When the candidates cannot cover `amount`
/// but fall short by no more than the policy's tolerance, every candidate is
/// spent and the transfer shrinks to the available balance. A change output
/// paying `change_script` is only added when the change exceeds the fee of
/// carrying it.
pub fn fund_spend(
    draft: &mut TxDraft,
    candidates: &[Utxo],
    amount: u64,
    destination_index: usize,
    change_script: ScriptBuf,
    rate: FeeRate,
    policy: SpendPolicy,
) -> Result<SpendOutcome> {
    if amount == 0 {
        return Err(Error::invalid("amount", "must be greater than zero"));
    }

    let (change, funded) =
        match fund(draft, candidates, amount, rate, FeeMode::AmountIncludesFees) {
            Ok(change) => (change, amount),
            Err(Error::NotEnoughFunds { shortfall }) => {
                let fees = draft.fee_at(rate, 0, 0);
                if shortfall > policy.overshoot_tolerance {
                    return Err(Error::InvalidAmount { fees, specified: amount });
                }
                debug!(shortfall, "spending maximum available balance");
                (0, amount - shortfall)
            }
            Err(e) => return Err(e),
        };

    let mut fee = draft.fee_at(rate, 0, 0);
    let change_fee = draft.fee_at(rate, 0, 1) - fee;

    let change = if change > change_fee {
        fee += change_fee;
        draft.add_output(change_script, change);
        change
    } else {
        0
    };

    let sent = funded
        .checked_sub(fee)
        .filter(|sent| *sent >= policy.dust_minimum)
        .ok_or(Error::InvalidAmount { fees: fee, specified: amount })?;
    draft.set_output_value(destination_index, sent)?;

    Ok(SpendOutcome { sent, change, fee })
}
