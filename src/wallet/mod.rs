//! Wallet-side construction of assignment marker transactions.
//!
//! The marker must be embedded in a transaction that spends a confirmed
//! P2WPKH output of the plot address — that spend is the ownership proof.
//! Coin listing, fee estimation, signing and broadcast stay behind
//! [`WalletBridge`]; this module owns the transaction shape: the largest
//! plot coin as input, the marker as output 0 with zero value, change back
//! to the plot address.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::address::AccountId;
use crate::assignments::opreturn::{create_assignment_op_return, create_revocation_op_return};
use crate::primitives::transaction::{OutPoint, Script, Transaction, TxIn, TxOut};

/// Wallet operations the host provides.
pub trait WalletBridge: Send + Sync {
    /// Confirmed spendable P2WPKH outputs of an account, with values.
    fn list_confirmed_utxos(&self, account: &AccountId) -> Vec<(OutPoint, u64)>;

    /// Fee for a transaction of this shape, in base units. `fee_rate` is
    /// the caller's override in base units per virtual byte.
    fn estimate_fee(&self, tx: &Transaction, fee_rate: Option<u64>) -> u64;

    /// Sign every input the wallet has keys for; errors if incomplete.
    fn sign_transaction(&self, tx: Transaction) -> Result<Transaction>;

    /// Hand the final transaction to the mempool/relay.
    fn broadcast(&self, tx: &Transaction) -> Result<()>;
}

/// Create, sign and broadcast an assignment marker transaction.
pub fn create_assignment_transaction(
    wallet: &dyn WalletBridge,
    plot: &AccountId,
    forge: &AccountId,
    fee_rate: Option<u64>,
) -> Result<Transaction> {
    let script = create_assignment_op_return(plot, forge);
    let tx = send_marker_transaction(wallet, plot, script, fee_rate)?;
    info!(target: "pocx::wallet", plot = %plot, forge = %forge,
          txid = %hex::encode(tx.txid()), "assignment transaction sent");
    Ok(tx)
}

/// Create, sign and broadcast a revocation marker transaction.
pub fn create_revocation_transaction(
    wallet: &dyn WalletBridge,
    plot: &AccountId,
    fee_rate: Option<u64>,
) -> Result<Transaction> {
    let script = create_revocation_op_return(plot);
    let tx = send_marker_transaction(wallet, plot, script, fee_rate)?;
    info!(target: "pocx::wallet", plot = %plot,
          txid = %hex::encode(tx.txid()), "revocation transaction sent");
    Ok(tx)
}

fn send_marker_transaction(
    wallet: &dyn WalletBridge,
    plot: &AccountId,
    marker: Script,
    fee_rate: Option<u64>,
) -> Result<Transaction> {
    // The largest confirmed plot coin both proves ownership and pays the
    // fee without pulling in extra inputs.
    let (outpoint, value) = wallet
        .list_confirmed_utxos(plot)
        .into_iter()
        .max_by_key(|(_, value)| *value)
        .ok_or_else(|| anyhow!("No coins available at the plot address. Cannot prove ownership."))?;

    let mut tx = Transaction {
        version: 2,
        inputs: vec![TxIn {
            prevout: outpoint,
            script_sig: Script(vec![]),
            sequence: u32::MAX,
        }],
        outputs: vec![
            TxOut {
                value: 0,
                script_pubkey: marker,
            },
            TxOut {
                value,
                script_pubkey: Script::p2wpkh(plot),
            },
        ],
        lock_time: 0,
    };

    let fee = wallet.estimate_fee(&tx, fee_rate);
    if fee >= value {
        return Err(anyhow!(
            "Plot coin of {value} base units cannot cover the fee of {fee}"
        ));
    }
    tx.outputs[1].value = value - fee;

    let signed = wallet
        .sign_transaction(tx)
        .context("failed to sign marker transaction")?;
    wallet.broadcast(&signed)?;
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignments::opreturn::parse_assignment_op_return;
    use parking_lot::Mutex;

    struct TestWallet {
        utxos: Vec<(OutPoint, u64)>,
        broadcasts: Mutex<Vec<Transaction>>,
    }

    impl WalletBridge for TestWallet {
        fn list_confirmed_utxos(&self, _: &AccountId) -> Vec<(OutPoint, u64)> {
            self.utxos.clone()
        }
        fn estimate_fee(&self, _: &Transaction, fee_rate: Option<u64>) -> u64 {
            fee_rate.unwrap_or(1) * 150
        }
        fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction> {
            for input in tx.inputs.iter_mut() {
                input.script_sig = Script(vec![0xAA]);
            }
            Ok(tx)
        }
        fn broadcast(&self, tx: &Transaction) -> Result<()> {
            self.broadcasts.lock().push(tx.clone());
            Ok(())
        }
    }

    fn outpoint(salt: u8) -> OutPoint {
        OutPoint {
            txid: [salt; 32],
            vout: 0,
        }
    }

    #[test]
    fn marker_spends_largest_coin_with_change() {
        let wallet = TestWallet {
            utxos: vec![(outpoint(1), 5_000), (outpoint(2), 80_000), (outpoint(3), 500)],
            broadcasts: Mutex::new(Vec::new()),
        };
        let plot = AccountId([1u8; 20]);
        let forge = AccountId([2u8; 20]);

        let tx = create_assignment_transaction(&wallet, &plot, &forge, None).unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].prevout, outpoint(2));
        assert_eq!(tx.outputs[0].value, 0);
        assert_eq!(
            parse_assignment_op_return(&tx.outputs[0].script_pubkey),
            Some((plot, forge))
        );
        assert_eq!(tx.outputs[1].script_pubkey.wpkh_account(), Some(plot));
        assert_eq!(tx.outputs[1].value, 80_000 - 150);
        assert_eq!(wallet.broadcasts.lock().len(), 1);
    }

    #[test]
    fn no_plot_coins_is_an_error() {
        let wallet = TestWallet {
            utxos: vec![],
            broadcasts: Mutex::new(Vec::new()),
        };
        let err = create_revocation_transaction(&wallet, &AccountId([1u8; 20]), None).unwrap_err();
        assert!(err.to_string().contains("No coins available"));
    }

    #[test]
    fn dust_coin_cannot_pay_fee() {
        let wallet = TestWallet {
            utxos: vec![(outpoint(1), 100)],
            broadcasts: Mutex::new(Vec::new()),
        };
        let err = create_revocation_transaction(&wallet, &AccountId([1u8; 20]), None).unwrap_err();
        assert!(err.to_string().contains("cannot cover the fee"));
    }
}
