// Path: crates/node/src/wallet.rs
//! A deterministic [`WalletIntegration`] stand-in. Real payment-destination
//! minting is an explicit external collaborator (see sections
//! 1/9) this repository doesn't implement; this node still needs *some*
//! concrete implementation to run standalone, so it derives a stable,
//! human-auditable destination string from the farmer identity rather than
//! ever leaving `payment_destination` blank on a completed contract.

use shardnet_api::wallet::{WalletError, WalletIntegration};
use shardnet_types::contact::Identity;

/// Mints `"local:{identity_hex}"` as a farmer's payment destination.
pub struct LocalWallet;

impl WalletIntegration for LocalWallet {
    fn mint_payment_destination(&self, farmer_id: &Identity) -> Result<String, WalletError> {
        Ok(format!("local:{}", farmer_id.to_hex()))
    }
}
