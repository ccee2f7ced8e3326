//! Transaction factory.
//!
//! Each protocol operation has an `estimate_*` method that prices the
//! transaction without keys or side effects, and a `make_*` method that
//! funds and signs it. Both start from the same skeleton, so their totals
//! agree: `inputs − payer change` of a made transaction equals the estimate
//! (preorders excepted, whose estimate also counts the dust that seeds the
//! change output).
//!
//! Output order per operation, after the payload at index 0:
//!
//! | Operation          | Outputs                                          |
//! |--------------------|--------------------------------------------------|
//! | preorder           | change, burn                                     |
//! | register           | owner, change                                    |
//! | update             | owner return, change                             |
//! | transfer           | new owner, owner return, change                  |
//! | renewal            | new owner, owner return, burn, change            |
//! | revoke             | owner return, change                             |
//! | namespace preorder | change, burn                                     |
//! | namespace reveal   | reveal address, change                           |
//! | namespace ready    | change                                           |
//! | name import        | recipient, zone-file hash, change                |
//! | announce           | change                                           |

use bitcoin::{Address, OutPoint};
use tracing::{debug, info};

use crate::btc::fees::FeeRate;
use crate::btc::funding::{fund, fund_spend, FeeMode, SpendPolicy};
use crate::btc::scripts::{default_burn_address, p2pkh_script_from_hash, OpReturnBuilder};
use crate::btc::tx_builder::{SignedTx, TxDraft};
use crate::btc::utxo::SelectionStrategy;
use crate::error::{Error, Result};
use crate::network::NetworkProvider;
use crate::operations::namespace::NamespaceDefinition;
use crate::operations::payloads::{self, OpCode};
use crate::utils::codec::{fixed_hex, hash160};
use crate::utils::constants::{DUMMY_CONSENSUS_HASH, DUMMY_VALUE_HASH};
use crate::utils::crypto::PaymentKey;

// ═══════════════════════════════════════════════════════════════════════════════
// SKELETON
// ═══════════════════════════════════════════════════════════════════════════════

/// Unfunded transaction for one operation
#[derive(Debug, Clone)]
struct Skeleton {
    op: OpCode,
    draft: TxDraft,
    /// Output receiving the payer's change, when the skeleton seeds one
    change_index: Option<usize>,
    /// Output returning the asserted owner UTXO, when the skeleton places one
    owner_return_index: Option<usize>,
    /// Whether one owner UTXO is consumed as an ownership assertion
    spends_owner_utxo: bool,
}

impl Skeleton {
    fn new(op: OpCode, payload: &[u8]) -> Result<Self> {
        let mut draft = TxDraft::new();
        draft.add_output(OpReturnBuilder::build(payload)?, 0);
        Ok(Self {
            op,
            draft,
            change_index: None,
            owner_return_index: None,
            spends_owner_utxo: false,
        })
    }

    fn with_owner_utxo(mut self) -> Self {
        self.spends_owner_utxo = true;
        self
    }

    /// Fee plus value leaving the payer, assuming `payment_utxos` payer inputs
    /// and an owner UTXO worth exactly the value placed for it
    fn estimate(&self, rate: FeeRate, payment_utxos: usize) -> Result<u64> {
        let extra_inputs = payment_utxos + usize::from(self.spends_owner_utxo);
        let extra_outputs = usize::from(self.change_index.is_none())
            + usize::from(self.spends_owner_utxo && self.owner_return_index.is_none());

        let refunded = match self.owner_return_index {
            Some(index) => self.draft.output_value(index)?,
            None => 0,
        };

        let fee = self.draft.fee_at(rate, extra_inputs, extra_outputs);
        let cost = (fee + self.draft.total_output()).saturating_sub(refunded);
        debug!(op = %self.op, extra_inputs, extra_outputs, fee, cost, "estimated");
        Ok(cost)
    }
}

/// Split `name.namespace` and return the namespace
fn namespace_of(name: &str) -> Result<&str> {
    name.rsplit_once('.')
        .map(|(_, namespace)| namespace)
        .filter(|namespace| !namespace.is_empty())
        .ok_or_else(|| Error::invalid("name", "must be fully qualified as name.namespace"))
}

/// Explicit value hash, else the hash of the zone file
fn resolve_value_hash(zonefile: Option<&str>, value_hash: Option<&str>) -> Option<String> {
    value_hash
        .map(str::to_string)
        .or_else(|| zonefile.map(|z| hex::encode(hash160(z.as_bytes()))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// FACTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds, funds and signs protocol transactions
#[derive(Debug, Clone, Copy)]
pub struct TransactionFactory<'a> {
    provider: &'a NetworkProvider,
}

impl<'a> TransactionFactory<'a> {
    /// Create a factory over `provider`
    pub fn new(provider: &'a NetworkProvider) -> Self {
        Self { provider }
    }

    fn dust(&self) -> u64 {
        self.provider.dust_minimum()
    }

    fn address(&self, name: &str, value: &str) -> Result<Address> {
        self.provider.parse_address(name, value)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Skeletons
    // ───────────────────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn preorder_skeleton(
        &self,
        name: &str,
        destination: &Address,
        payer: &Address,
        burn_address: &Address,
        price: u64,
        consensus_hash: &str,
    ) -> Result<Skeleton> {
        let payload = payloads::preorder(name, &payer.script_pubkey(), Some(destination), consensus_hash)?;
        let mut skeleton = Skeleton::new(OpCode::Preorder, &payload)?;
        skeleton.change_index = Some(skeleton.draft.add_output_to(payer, self.dust()));
        skeleton.draft.add_output_to(burn_address, price);
        Ok(skeleton)
    }

    fn register_skeleton(&self, name: &str, destination: &Address, value_hash: Option<&str>) -> Result<Skeleton> {
        let payload = payloads::register(name, value_hash)?;
        let mut skeleton = Skeleton::new(OpCode::Register, &payload)?;
        skeleton.draft.add_output_to(destination, self.dust());
        Ok(skeleton)
    }

    fn update_skeleton(&self, name: &str, consensus_hash: &str, value_hash: &str) -> Result<Skeleton> {
        let payload = payloads::update(name, consensus_hash, value_hash)?;
        Ok(Skeleton::new(OpCode::Update, &payload)?.with_owner_utxo())
    }

    fn transfer_skeleton(
        &self,
        name: &str,
        destination: &Address,
        keep_zonefile: bool,
        consensus_hash: &str,
    ) -> Result<Skeleton> {
        let payload = payloads::transfer(name, keep_zonefile, consensus_hash)?;
        let mut skeleton = Skeleton::new(OpCode::Transfer, &payload)?.with_owner_utxo();
        skeleton.draft.add_output_to(destination, self.dust());
        Ok(skeleton)
    }

    fn revoke_skeleton(&self, name: &str) -> Result<Skeleton> {
        let payload = payloads::revoke(name)?;
        Ok(Skeleton::new(OpCode::Revoke, &payload)?.with_owner_utxo())
    }

    fn renewal_skeleton(
        &self,
        name: &str,
        destination: &Address,
        owner: &Address,
        burn_address: &Address,
        price: u64,
        value_hash: Option<&str>,
    ) -> Result<Skeleton> {
        let mut skeleton = self.register_skeleton(name, destination, value_hash)?.with_owner_utxo();
        skeleton.owner_return_index = Some(skeleton.draft.add_output_to(owner, self.dust()));
        skeleton.draft.add_output_to(burn_address, price);
        Ok(skeleton)
    }

    fn namespace_preorder_skeleton(
        &self,
        namespace_id: &str,
        reveal_address: &Address,
        payer: &Address,
        price: u64,
        consensus_hash: &str,
    ) -> Result<Skeleton> {
        let payload =
            payloads::namespace_preorder(namespace_id, &payer.script_pubkey(), reveal_address, consensus_hash)?;
        let mut skeleton = Skeleton::new(OpCode::NamespacePreorder, &payload)?;
        skeleton.change_index = Some(skeleton.draft.add_output_to(payer, self.dust()));
        skeleton
            .draft
            .add_output_to(&default_burn_address(self.provider.network()), price);
        Ok(skeleton)
    }

    fn namespace_reveal_skeleton(&self, namespace: &NamespaceDefinition, reveal_address: &Address) -> Result<Skeleton> {
        let payload = payloads::namespace_reveal(namespace)?;
        let mut skeleton = Skeleton::new(OpCode::NamespaceReveal, &payload)?;
        skeleton.draft.add_output_to(reveal_address, self.dust());
        Ok(skeleton)
    }

    fn name_import_skeleton(&self, name: &str, recipient: &Address, zonefile_hash: &str) -> Result<Skeleton> {
        let hash = fixed_hex::<20>("zonefile_hash", zonefile_hash)?;
        let payload = payloads::name_import(name)?;
        let mut skeleton = Skeleton::new(OpCode::NameImport, &payload)?;
        skeleton.draft.add_output_to(recipient, self.dust());
        skeleton.draft.add_output(p2pkh_script_from_hash(hash), self.dust());
        Ok(skeleton)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Funding and signing
    // ───────────────────────────────────────────────────────────────────────────

    async fn fund_and_sign(
        &self,
        skeleton: Skeleton,
        payer: &PaymentKey,
        owner: Option<&PaymentKey>,
        rate: FeeRate,
    ) -> Result<String> {
        let Skeleton {
            op,
            mut draft,
            change_index,
            owner_return_index,
            spends_owner_utxo,
        } = skeleton;

        let mut owner_value = 0;
        let mut owner_outpoint: Option<OutPoint> = None;
        let owner_key = if spends_owner_utxo {
            let owner = owner.ok_or_else(|| Error::missing("owner_key"))?;
            let mut owner_utxos = self.provider.get_utxos(&owner.address().to_string()).await?;
            SelectionStrategy::SmallestFirst.apply(&mut owner_utxos);
            let utxo = owner_utxos
                .into_iter()
                .next()
                .ok_or_else(|| Error::invalid("owner_key", "owner address has no UTXOs"))?;

            draft.add_input(&utxo);
            match owner_return_index {
                Some(index) => draft.set_output_value(index, utxo.value)?,
                None => {
                    draft.add_output_to(owner.address(), utxo.value);
                }
            }
            owner_value = utxo.value;
            owner_outpoint = Some(utxo.outpoint());
            owner
        } else {
            payer
        };

        let change_index = match change_index {
            Some(index) => index,
            None => draft.add_output_to(payer.address(), self.dust()),
        };

        let mut candidates = self.provider.get_utxos(&payer.address().to_string()).await?;
        candidates.retain(|u| Some(u.outpoint()) != owner_outpoint);
        SelectionStrategy::LargestFirst.apply(&mut candidates);

        let target = (draft.fee_at(rate, 0, 0) + draft.total_output()).saturating_sub(owner_value);
        let change = fund(&mut draft, &candidates, target, rate, FeeMode::AddInputFees)?;
        let seeded = draft.output_value(change_index)?;
        draft.set_output_value(change_index, seeded + change)?;

        let owner_input = owner_outpoint.map(|_| 0usize);
        let signed = draft.sign(|index| if Some(index) == owner_input { owner_key } else { payer })?;

        self.log_built(op, &signed);
        Ok(signed.to_hex())
    }

    fn log_built(&self, op: OpCode, signed: &SignedTx) {
        info!(
            op = %op,
            txid = %signed.txid(),
            inputs = signed.transaction().input.len(),
            outputs = signed.transaction().output.len(),
            size = signed.size(),
            fee = signed.fee(),
            "transaction built"
        );
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Name preorder
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of preordering `name` for `destination`, paid from `payment_address`
    pub async fn estimate_preorder(
        &self,
        name: &str,
        destination: &str,
        payment_address: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        let destination = self.address("destination", destination)?;
        let payer = self.address("payment_address", payment_address)?;
        namespace_of(name)?;

        let (rate, price) = tokio::try_join!(self.provider.get_fee_rate(), self.provider.get_name_price(name))?;
        let burn = default_burn_address(self.provider.network());
        self.preorder_skeleton(name, &destination, &payer, &burn, price, DUMMY_CONSENSUS_HASH)?
            .estimate(rate, payment_utxos)
    }

    /// Signed preorder of `name` for `destination`
    pub async fn make_preorder(&self, name: &str, destination: &str, payment_key: &PaymentKey) -> Result<String> {
        let destination = self.address("destination", destination)?;
        let namespace = namespace_of(name)?;

        let (rate, price, burn, consensus) = tokio::try_join!(
            self.provider.get_fee_rate(),
            self.provider.get_name_price(name),
            self.provider.get_namespace_burn_address(namespace),
            self.provider.get_consensus_hash(),
        )?;

        let skeleton =
            self.preorder_skeleton(name, &destination, payment_key.address(), &burn, price, &consensus)?;
        self.fund_and_sign(skeleton, payment_key, None, rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Name register
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of registering `name`; `include_zonefile` reserves room for a value hash
    pub async fn estimate_register(
        &self,
        name: &str,
        destination: &str,
        payment_address: &str,
        include_zonefile: bool,
        payment_utxos: usize,
    ) -> Result<u64> {
        let destination = self.address("destination", destination)?;
        self.address("payment_address", payment_address)?;

        let rate = self.provider.get_fee_rate().await?;
        let value_hash = include_zonefile.then_some(DUMMY_VALUE_HASH);
        self.register_skeleton(name, &destination, value_hash)?
            .estimate(rate, payment_utxos)
    }

    /// Signed registration of `name`, committing to `zonefile` or `value_hash`
    pub async fn make_register(
        &self,
        name: &str,
        destination: &str,
        payment_key: &PaymentKey,
        zonefile: Option<&str>,
        value_hash: Option<&str>,
    ) -> Result<String> {
        let destination = self.address("destination", destination)?;
        let value_hash = resolve_value_hash(zonefile, value_hash);

        let rate = self.provider.get_fee_rate().await?;
        let skeleton = self.register_skeleton(name, &destination, value_hash.as_deref())?;
        self.fund_and_sign(skeleton, payment_key, None, rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Name update
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of updating the zone file hash of `name`
    pub async fn estimate_update(
        &self,
        name: &str,
        owner_address: &str,
        payment_address: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        self.address("owner_address", owner_address)?;
        self.address("payment_address", payment_address)?;

        let rate = self.provider.get_fee_rate().await?;
        self.update_skeleton(name, DUMMY_CONSENSUS_HASH, DUMMY_VALUE_HASH)?
            .estimate(rate, payment_utxos)
    }

    /// Signed update of `name` to `zonefile` (or an explicit `value_hash`)
    pub async fn make_update(
        &self,
        name: &str,
        owner_key: &PaymentKey,
        payment_key: &PaymentKey,
        zonefile: Option<&str>,
        value_hash: Option<&str>,
    ) -> Result<String> {
        let value_hash = resolve_value_hash(zonefile, value_hash).ok_or_else(|| Error::missing("zonefile"))?;

        let (rate, consensus) =
            tokio::try_join!(self.provider.get_fee_rate(), self.provider.get_consensus_hash())?;
        let skeleton = self.update_skeleton(name, &consensus, &value_hash)?;
        self.fund_and_sign(skeleton, payment_key, Some(owner_key), rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Name transfer
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of transferring `name` to `destination`
    pub async fn estimate_transfer(
        &self,
        name: &str,
        destination: &str,
        owner_address: &str,
        payment_address: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        let destination = self.address("destination", destination)?;
        self.address("owner_address", owner_address)?;
        self.address("payment_address", payment_address)?;

        let rate = self.provider.get_fee_rate().await?;
        self.transfer_skeleton(name, &destination, true, DUMMY_CONSENSUS_HASH)?
            .estimate(rate, payment_utxos)
    }

    /// Signed transfer of `name` to `destination`
    pub async fn make_transfer(
        &self,
        name: &str,
        destination: &str,
        owner_key: &PaymentKey,
        payment_key: &PaymentKey,
        keep_zonefile: bool,
    ) -> Result<String> {
        let destination = self.address("destination", destination)?;

        let (rate, consensus) =
            tokio::try_join!(self.provider.get_fee_rate(), self.provider.get_consensus_hash())?;
        let skeleton = self.transfer_skeleton(name, &destination, keep_zonefile, &consensus)?;
        self.fund_and_sign(skeleton, payment_key, Some(owner_key), rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Name revoke
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of revoking `name`
    pub async fn estimate_revoke(
        &self,
        name: &str,
        owner_address: &str,
        payment_address: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        self.address("owner_address", owner_address)?;
        self.address("payment_address", payment_address)?;

        let rate = self.provider.get_fee_rate().await?;
        self.revoke_skeleton(name)?.estimate(rate, payment_utxos)
    }

    /// Signed revocation of `name`
    pub async fn make_revoke(&self, name: &str, owner_key: &PaymentKey, payment_key: &PaymentKey) -> Result<String> {
        let rate = self.provider.get_fee_rate().await?;
        let skeleton = self.revoke_skeleton(name)?;
        self.fund_and_sign(skeleton, payment_key, Some(owner_key), rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Name renewal
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of renewing `name`, optionally moving it to `destination`
    #[allow(clippy::too_many_arguments)]
    pub async fn estimate_renewal(
        &self,
        name: &str,
        destination: &str,
        owner_address: &str,
        payment_address: &str,
        include_zonefile: bool,
        payment_utxos: usize,
    ) -> Result<u64> {
        let destination = self.address("destination", destination)?;
        let owner = self.address("owner_address", owner_address)?;
        self.address("payment_address", payment_address)?;
        namespace_of(name)?;

        let (rate, price) = tokio::try_join!(self.provider.get_fee_rate(), self.provider.get_name_price(name))?;
        let burn = default_burn_address(self.provider.network());
        let value_hash = include_zonefile.then_some(DUMMY_VALUE_HASH);
        self.renewal_skeleton(name, &destination, &owner, &burn, price, value_hash)?
            .estimate(rate, payment_utxos)
    }

    /// Signed renewal of `name`
    pub async fn make_renewal(
        &self,
        name: &str,
        destination: &str,
        owner_key: &PaymentKey,
        payment_key: &PaymentKey,
        zonefile: Option<&str>,
        value_hash: Option<&str>,
    ) -> Result<String> {
        let destination = self.address("destination", destination)?;
        let namespace = namespace_of(name)?;
        let value_hash = resolve_value_hash(zonefile, value_hash);

        let (rate, price, burn) = tokio::try_join!(
            self.provider.get_fee_rate(),
            self.provider.get_name_price(name),
            self.provider.get_namespace_burn_address(namespace),
        )?;

        let skeleton = self.renewal_skeleton(
            name,
            &destination,
            owner_key.address(),
            &burn,
            price,
            value_hash.as_deref(),
        )?;
        self.fund_and_sign(skeleton, payment_key, Some(owner_key), rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Namespaces
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of preordering `namespace_id`
    pub async fn estimate_namespace_preorder(
        &self,
        namespace_id: &str,
        reveal_address: &str,
        payment_address: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        let reveal_address = self.address("reveal_address", reveal_address)?;
        let payer = self.address("payment_address", payment_address)?;

        let (rate, price) = tokio::try_join!(
            self.provider.get_fee_rate(),
            self.provider.get_namespace_price(namespace_id)
        )?;
        self.namespace_preorder_skeleton(namespace_id, &reveal_address, &payer, price, DUMMY_CONSENSUS_HASH)?
            .estimate(rate, payment_utxos)
    }

    /// Signed namespace preorder
    pub async fn make_namespace_preorder(
        &self,
        namespace_id: &str,
        reveal_address: &str,
        payment_key: &PaymentKey,
    ) -> Result<String> {
        let reveal_address = self.address("reveal_address", reveal_address)?;

        let (rate, price, consensus) = tokio::try_join!(
            self.provider.get_fee_rate(),
            self.provider.get_namespace_price(namespace_id),
            self.provider.get_consensus_hash(),
        )?;

        let skeleton = self.namespace_preorder_skeleton(
            namespace_id,
            &reveal_address,
            payment_key.address(),
            price,
            &consensus,
        )?;
        self.fund_and_sign(skeleton, payment_key, None, rate).await
    }

    /// Cost of revealing `namespace`
    pub async fn estimate_namespace_reveal(
        &self,
        namespace: &NamespaceDefinition,
        reveal_address: &str,
        payment_address: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        let reveal_address = self.address("reveal_address", reveal_address)?;
        self.address("payment_address", payment_address)?;

        let rate = self.provider.get_fee_rate().await?;
        self.namespace_reveal_skeleton(namespace, &reveal_address)?
            .estimate(rate, payment_utxos)
    }

    /// Signed namespace reveal
    pub async fn make_namespace_reveal(
        &self,
        namespace: &NamespaceDefinition,
        reveal_address: &str,
        payment_key: &PaymentKey,
    ) -> Result<String> {
        let reveal_address = self.address("reveal_address", reveal_address)?;

        let rate = self.provider.get_fee_rate().await?;
        let skeleton = self.namespace_reveal_skeleton(namespace, &reveal_address)?;
        self.fund_and_sign(skeleton, payment_key, None, rate).await
    }

    /// Cost of launching `namespace_id`
    pub async fn estimate_namespace_ready(&self, namespace_id: &str, payment_utxos: usize) -> Result<u64> {
        let rate = self.provider.get_fee_rate().await?;
        let payload = payloads::namespace_ready(namespace_id)?;
        Skeleton::new(OpCode::NamespaceReady, &payload)?.estimate(rate, payment_utxos)
    }

    /// Signed namespace ready, paid and signed by the reveal key
    pub async fn make_namespace_ready(&self, namespace_id: &str, reveal_key: &PaymentKey) -> Result<String> {
        let rate = self.provider.get_fee_rate().await?;
        let payload = payloads::namespace_ready(namespace_id)?;
        let skeleton = Skeleton::new(OpCode::NamespaceReady, &payload)?;
        self.fund_and_sign(skeleton, reveal_key, None, rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Import and announce
    // ───────────────────────────────────────────────────────────────────────────

    /// Cost of importing `name` for `recipient`
    pub async fn estimate_name_import(
        &self,
        name: &str,
        recipient: &str,
        zonefile_hash: &str,
        payment_utxos: usize,
    ) -> Result<u64> {
        let recipient = self.address("recipient", recipient)?;

        let rate = self.provider.get_fee_rate().await?;
        self.name_import_skeleton(name, &recipient, zonefile_hash)?
            .estimate(rate, payment_utxos)
    }

    /// Signed name import, paid and signed by the namespace import key
    pub async fn make_name_import(
        &self,
        name: &str,
        recipient: &str,
        zonefile_hash: &str,
        import_key: &PaymentKey,
    ) -> Result<String> {
        let recipient = self.address("recipient", recipient)?;

        let rate = self.provider.get_fee_rate().await?;
        let skeleton = self.name_import_skeleton(name, &recipient, zonefile_hash)?;
        self.fund_and_sign(skeleton, import_key, None, rate).await
    }

    /// Cost of announcing `message_hash`
    pub async fn estimate_announce(&self, message_hash: &str, payment_utxos: usize) -> Result<u64> {
        let rate = self.provider.get_fee_rate().await?;
        let payload = payloads::announce(message_hash)?;
        Skeleton::new(OpCode::Announce, &payload)?.estimate(rate, payment_utxos)
    }

    /// Signed announcement
    pub async fn make_announce(&self, message_hash: &str, sender_key: &PaymentKey) -> Result<String> {
        let rate = self.provider.get_fee_rate().await?;
        let payload = payloads::announce(message_hash)?;
        let skeleton = Skeleton::new(OpCode::Announce, &payload)?;
        self.fund_and_sign(skeleton, sender_key, None, rate).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Plain value transfer
    // ───────────────────────────────────────────────────────────────────────────

    /// Send `amount` satoshis, fees included, to `destination`.
    ///
    /// A request exceeding the balance by at most the configured tolerance
    /// spends the whole balance instead.
    pub async fn make_bitcoin_spend(
        &self,
        destination: &str,
        payment_key: &PaymentKey,
        amount: u64,
    ) -> Result<String> {
        let destination = self.address("destination", destination)?;

        let payment_address = payment_key.address().to_string();
        let (rate, mut candidates) = tokio::try_join!(
            self.provider.get_fee_rate(),
            self.provider.get_utxos(&payment_address),
        )?;
        SelectionStrategy::LargestFirst.apply(&mut candidates);

        let mut draft = TxDraft::new();
        let destination_index = draft.add_output_to(&destination, 0);
        let policy = SpendPolicy {
            dust_minimum: self.dust(),
            overshoot_tolerance: self.provider.config().spend_overshoot_tolerance,
        };

        let outcome = fund_spend(
            &mut draft,
            &candidates,
            amount,
            destination_index,
            payment_key.script_pubkey(),
            rate,
            policy,
        )?;
        debug!(sent = outcome.sent, change = outcome.change, fee = outcome.fee, "spend funded");

        let signed = draft.sign(|_| payment_key)?;
        info!(
            txid = %signed.txid(),
            inputs = signed.transaction().input.len(),
            sent = outcome.sent,
            fee = signed.fee(),
            "value transfer built"
        );
        Ok(signed.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btc::scripts::parse_address;
    use bitcoin::Network;

    fn address(s: &str) -> Address {
        parse_address("address", s, Network::Bitcoin).unwrap()
    }

    #[test]
    fn test_namespace_of() {
        assert_eq!(namespace_of("foo.test").unwrap(), "test");
        assert_eq!(namespace_of("a.b.c").unwrap(), "c");
        assert!(namespace_of("foo").is_err());
        assert!(namespace_of("foo.").is_err());
    }

    #[test]
    fn test_resolve_value_hash() {
        assert_eq!(
            resolve_value_hash(Some("hello world"), None).as_deref(),
            Some("d7d5ee7824ff93f94c3055af9382c86c68b5ca92")
        );
        assert_eq!(resolve_value_hash(Some("x"), Some("ab")).as_deref(), Some("ab"));
        assert_eq!(resolve_value_hash(None, None), None);
    }

    #[test]
    fn test_skeleton_estimate_counts_missing_outputs() {
        let rate = FeeRate::from_sat_per_byte(1);
        let owner = address("1br553PVnK6F5nyBtb4ju1owwBKdsep5c");

        let payload = payloads::revoke("foo.test").unwrap();
        let skeleton = Skeleton::new(OpCode::Revoke, &payload).unwrap().with_owner_utxo();

        let mut expected = skeleton.draft.clone();
        expected.add_output_to(&owner, 5_500);
        expected.add_output_to(&owner, 5_500);
        let bytes = expected.estimate_bytes(3, 0);

        assert_eq!(skeleton.estimate(rate, 2).unwrap(), bytes);
    }

    #[test]
    fn test_skeleton_estimate_subtracts_refund() {
        let rate = FeeRate::from_sat_per_byte(1);
        let owner = address("1br553PVnK6F5nyBtb4ju1owwBKdsep5c");

        let payload = payloads::register("foo.test", None).unwrap();
        let mut skeleton = Skeleton::new(OpCode::Register, &payload).unwrap().with_owner_utxo();
        skeleton.draft.add_output_to(&owner, 5_500);
        skeleton.owner_return_index = Some(skeleton.draft.add_output_to(&owner, 5_500));

        let bytes = skeleton.draft.estimate_bytes(2, 1);
        assert_eq!(skeleton.estimate(rate, 1).unwrap(), bytes + 5_500);
    }
}
