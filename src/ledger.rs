//! The ledger: authoritative persistent state, append-only block history,
//! and the canonical KV store with prefix iteration (spec §4.1). Grounded on
//! `gillean::blockchain::Blockchain` (in-memory chain + mempool + UTXO set)
//! and `gillean::storage::BlockchainStorage` (sled-backed persistence,
//! snapshot/WAL split), generalised to the spec's WAL/snapshot/archive
//! lifecycle and token/state/contract bookkeeping.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::balance::BalanceTable;
use crate::block::{Block, SubBlock};
use crate::contract::Contract;
use crate::error::{Result, SynnergyError};
use crate::fees::{self, FeePools};
use crate::gas::GasMeter;
use crate::state::StateStore;
use crate::transaction::Transaction;
use crate::types::{Address, Hash, Location, TokenId};
use crate::utxo::{OutPoint, TxOutput, UtxoSet};
use crate::vm::{self, ChainContext, ExecStatus, ExecutionContext, Host, Receipt, SelectedBackend, VmBackend};

const WAL_FILE: &str = "wal.log";
const SNAPSHOT_FILE: &str = "snap.json";
const ARCHIVE_FILE: &str = "archive.gz";
const KV_MIRROR_DIR: &str = "state_db";

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub snapshot_interval: u64,
    pub prune_interval: u64,
    pub retention: u64,
    pub fee_pools: FeePools,
    pub fee_token: TokenId,
    pub max_supply: Option<u64>,
    pub chain_id: u64,
}

#[derive(Serialize, Deserialize)]
struct BalanceEntry {
    token: TokenId,
    address: Address,
    amount: u64,
}

#[derive(Serialize, Deserialize)]
struct SupplyEntry {
    token: TokenId,
    amount: u64,
}

#[derive(Serialize, Deserialize)]
struct StateEntry {
    key: Vec<u8>,
    value: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct UtxoEntry {
    out_point: OutPoint,
    output: TxOutput,
}

/// Canonical serialisation of the full ledger state (spec §4.1 `snapshot()`,
/// §6 `snap.json`).
#[derive(Serialize, Deserialize)]
pub struct LedgerSnapshot {
    chain: Vec<Block>,
    pruned_count: u64,
    state_entries: Vec<StateEntry>,
    balance_entries: Vec<BalanceEntry>,
    supply_entries: Vec<SupplyEntry>,
    lp_balance_entries: Vec<BalanceEntry>,
    lp_supply_entries: Vec<SupplyEntry>,
    utxo_entries: Vec<UtxoEntry>,
    nonces: Vec<(Address, u64)>,
    contracts: Vec<Contract>,
}

/// The authoritative ledger: in-memory chain tail, canonical state, token
/// balances, UTXO set, mempool, and deployed-contract map, backed by a WAL +
/// periodic snapshot + gzip archive on disk (spec §4.1, §6).
pub struct Ledger {
    dir: PathBuf,
    chain: Vec<Block>,
    pruned_count: u64,
    state: StateStore,
    balances: BalanceTable,
    lp_balances: BalanceTable,
    utxos: UtxoSet,
    mempool: Vec<Transaction>,
    contracts: std::collections::HashMap<Address, Contract>,
    nonces: std::collections::HashMap<Address, u64>,
    node_locations: std::collections::HashMap<Address, Location>,
    config: LedgerConfig,
    wal: Option<File>,
    /// Durable mirror of `state`'s key/value space, exactly as
    /// `gillean::storage::BlockchainStorage` keeps a `sled::Tree` alongside
    /// its in-memory chain: queryable by key-convention prefix
    /// (spec §6) without deserialising the whole JSON snapshot, and a
    /// fallback hydration source if `snap.json` is missing or corrupt.
    kv: sled::Db,
    blocks_since_snapshot: u64,
    blocks_since_prune: u64,
}

impl Ledger {
    /// Open (or initialise) a ledger rooted at `dir`: load `snap.json` first
    /// if present, then replay `wal.log` on top of it; otherwise start from
    /// genesis (spec §6).
    pub fn open(dir: impl AsRef<Path>, config: LedgerConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let kv = sled::open(dir.join(KV_MIRROR_DIR))
            .map_err(|e| SynnergyError::IOFailure(format!("opening state_db failed: {e}")))?;

        let mut ledger = Ledger {
            dir: dir.clone(),
            chain: vec![Block::genesis()],
            pruned_count: 0,
            state: StateStore::new(),
            balances: BalanceTable::new(),
            lp_balances: BalanceTable::new(),
            utxos: UtxoSet::new(),
            mempool: Vec::new(),
            contracts: std::collections::HashMap::new(),
            nonces: std::collections::HashMap::new(),
            node_locations: std::collections::HashMap::new(),
            config,
            wal: None,
            kv,
            blocks_since_snapshot: 0,
            blocks_since_prune: 0,
        };

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        if snapshot_path.exists() {
            let bytes = fs::read(&snapshot_path)?;
            let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
            ledger.restore_snapshot(snapshot);
        } else {
            ledger.hydrate_state_from_kv()?;
        }

        let wal_path = dir.join(WAL_FILE);
        if wal_path.exists() {
            let file = File::open(&wal_path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let block: Block = serde_json::from_str(&line)?;
                ledger.apply_block_in_memory(block)?;
            }
        }

        ledger.wal = Some(OpenOptions::new().create(true).append(true).open(&wal_path)?);
        Ok(ledger)
    }

    pub fn height(&self) -> u64 {
        self.pruned_count + self.chain.len() as u64 - 1
    }

    pub fn tip(&self) -> &Block {
        self.chain.last().expect("chain always has at least genesis")
    }

    pub fn chain_len(&self) -> u64 {
        self.pruned_count + self.chain.len() as u64
    }

    pub fn state_root(&self) -> Hash {
        self.state.state_root()
    }

    pub fn prefix_iterator(&self, prefix: &[u8]) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> + '_ {
        self.state.prefix_iter(prefix)
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateStore {
        &mut self.state
    }

    pub fn balances(&self) -> &BalanceTable {
        &self.balances
    }

    pub fn balances_mut(&mut self) -> &mut BalanceTable {
        &mut self.balances
    }

    pub fn lp_balances_mut(&mut self) -> &mut BalanceTable {
        &mut self.lp_balances
    }

    pub fn register_node_location(&mut self, addr: Address, location: Location) {
        self.node_locations.insert(addr, location);
    }

    pub fn node_location(&self, addr: Address) -> Option<&Location> {
        self.node_locations.get(&addr)
    }

    pub fn submit_to_mempool(&mut self, tx: Transaction) {
        self.mempool.push(tx);
    }

    pub fn mempool(&self) -> &[Transaction] {
        &self.mempool
    }

    pub fn nonce_of(&self, addr: Address) -> u64 {
        *self.nonces.get(&addr).unwrap_or(&0)
    }

    /// Append a sub-block to the tip, rejecting a duplicate height (spec §8
    /// scenario 3). Persists the block unchanged afterwards is the caller's
    /// responsibility via a follow-up `add_block`/rewrite if needed.
    pub fn append_sub_block(&mut self, sub_block: SubBlock) -> Result<()> {
        let tip = self.chain.last_mut().expect("chain always has at least genesis");
        tip.append_sub_block(sub_block)
    }

    /// Apply `block` against the ledger: validates linkage, applies every
    /// transaction's effects, charges and distributes fees, appends to the
    /// chain, writes the WAL, and runs the snapshot/prune cycle (spec §4.1).
    ///
    /// Block-level atomicity: if any transaction fails, the ledger's state is
    /// rolled back to before this call and the block is rejected untouched
    /// (spec §7).
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        let expected_height = self.height() + 1;
        if block.header.height != expected_height {
            return Err(SynnergyError::StateViolation(format!(
                "block height {} does not match expected height {}",
                block.header.height, expected_height
            )));
        }
        block.validate_linkage(self.tip())?;

        let before_state = self.state.snapshot();
        let before_balances = self.balances.clone();
        let before_lp_balances = self.lp_balances.clone();
        let before_utxos = self.utxos.clone();
        let before_contracts = self.contracts.clone();
        let before_nonces = self.nonces.clone();

        if let Err(err) = self.apply_transactions(&block) {
            self.state.restore(before_state);
            self.balances = before_balances;
            self.lp_balances = before_lp_balances;
            self.utxos = before_utxos;
            self.contracts = before_contracts;
            self.nonces = before_nonces;
            return Err(err);
        }

        self.mempool.retain(|tx| !block.body.transactions.iter().any(|applied| applied.hash == tx.hash));
        self.chain.push(block.clone());

        self.write_wal_line(&block)?;

        self.blocks_since_snapshot += 1;
        if self.blocks_since_snapshot >= self.config.snapshot_interval.max(1) {
            if let Err(err) = self.write_snapshot() {
                log::warn!("snapshot write failed (non-fatal): {err}");
            } else {
                self.truncate_wal()?;
            }
            self.blocks_since_snapshot = 0;
        }

        self.blocks_since_prune += 1;
        if self.blocks_since_prune >= self.config.prune_interval.max(1)
            && self.chain_len() > self.config.retention
        {
            self.prune()?;
            self.blocks_since_prune = 0;
        }

        Ok(())
    }

    fn apply_transactions(&mut self, block: &Block) -> Result<()> {
        for tx in &block.body.transactions {
            tx.validate()?;

            if let Some(out_point) = first_consumed_outpoint(tx) {
                self.utxos.remove(&out_point);
            }
            let out_point = OutPoint { tx_hash: tx.hash, index: 0 };
            if tx.value > 0 {
                self.utxos.insert(out_point, TxOutput { value: tx.value, pubkey_hash: tx.to });
            }

            if let Some(changes) = &tx.state_changes {
                for (k, v) in changes {
                    self.state.put(k.clone(), v.clone());
                }
            }

            self.mempool.retain(|pending| pending.hash != tx.hash);

            if let Some(deploy) = &tx.contract_deploy {
                let nonce = self.nonce_of(tx.from);
                let contract = Contract::new(tx.from, nonce, deploy.bytecode.clone());
                self.contracts.insert(contract.address, contract);
            }

            if tx.tx_type == crate::transaction::TransactionType::ContractCall {
                self.execute_contract_call(tx)?;
            }

            if let Some(transfers) = &tx.token_transfers {
                for transfer in transfers {
                    self.balances.transfer(transfer.token, transfer.from, transfer.to, transfer.amount)?;
                }
            }

            let fee = tx.fee();
            if fee > 0 {
                fees::distribute(&mut self.balances, &self.config.fee_pools, self.config.fee_token, tx.from, fee)?;
            }

            let entry = self.nonces.entry(tx.from).or_insert(0);
            *entry += 1;
        }
        Ok(())
    }

    fn apply_block_in_memory(&mut self, block: Block) -> Result<()> {
        block.validate_linkage(self.tip())?;
        self.apply_transactions(&block)?;
        self.chain.push(block);
        Ok(())
    }

    /// Discard all in-memory state, reapply each block without persisting,
    /// then rewrite the WAL (spec §4.1, used by fork recovery).
    pub fn rebuild_chain(&mut self, blocks: Vec<Block>) -> Result<()> {
        self.chain = vec![Block::genesis()];
        self.pruned_count = 0;
        self.state = StateStore::new();
        self.balances = BalanceTable::new();
        self.lp_balances = BalanceTable::new();
        self.utxos = UtxoSet::new();
        self.contracts.clear();
        self.nonces.clear();

        for block in blocks {
            if block.is_genesis() {
                continue;
            }
            self.apply_block_in_memory(block)?;
        }

        self.rewrite_wal()
    }

    /// Execute `input` against `to`'s contract bytecode on a clone of the
    /// current state, discarding side effects (spec §4.1 read-only call).
    pub fn call(&self, from: Address, to: Address, input: Vec<u8>, value: u64, gas_limit: u64) -> Result<Receipt> {
        let contract = self
            .contracts
            .get(&to)
            .ok_or_else(|| SynnergyError::NotFound(format!("contract {to}")))?;

        let mut scratch = CallHost {
            state: self.state.clone(),
            balances: self.balances.clone(),
        };

        let backend: Box<dyn VmBackend> = match vm::select_backend(contract.bytecode.len()) {
            SelectedBackend::SuperLight => Box::new(crate::vm::super_light::SuperLightVm),
            SelectedBackend::Light => Box::new(crate::vm::light::LightVm),
            SelectedBackend::Heavy => Box::new(crate::vm::heavy::HeavyVm),
        };

        let ctx = ExecutionContext {
            caller: from,
            origin: from,
            tx_hash: Hash::of(&input),
            code: &contract.bytecode,
            input: &input,
            value,
            gas: GasMeter::new(gas_limit),
            chain: ChainContext {
                block_number: self.height(),
                block_time: crate::utils::now_secs(),
                difficulty: self.tip().header.difficulty,
                block_gas_limit: gas_limit,
                chain_id: self.config.chain_id,
                block_hash: self.tip().hash,
            },
            last_return_data: Vec::new(),
        };

        backend.execute(ctx, &mut scratch)
    }

    /// Execute a `ContractCall` transaction's payload against its callee's
    /// installed bytecode through the gas-metered VM backend selected by
    /// code size (spec §2: "each transaction is executed via a VM backend
    /// selected by code size"), applying state and balance effects directly
    /// to the live ledger rather than a scratch clone. A failed receipt
    /// (including out-of-gas, spec §4.3) fails the transaction, which rolls
    /// back the whole block via `add_block`'s snapshot/restore (spec §7).
    fn execute_contract_call(&mut self, tx: &Transaction) -> Result<Receipt> {
        let contract = self
            .contracts
            .get(&tx.to)
            .cloned()
            .ok_or_else(|| SynnergyError::NotFound(format!("contract {}", tx.to)))?;

        let backend: Box<dyn VmBackend> = match vm::select_backend(contract.bytecode.len()) {
            SelectedBackend::SuperLight => Box::new(crate::vm::super_light::SuperLightVm),
            SelectedBackend::Light => Box::new(crate::vm::light::LightVm),
            SelectedBackend::Heavy => Box::new(crate::vm::heavy::HeavyVm),
        };

        let ctx = ExecutionContext {
            caller: tx.from,
            origin: tx.from,
            tx_hash: tx.hash,
            code: &contract.bytecode,
            input: &tx.payload,
            value: tx.value,
            gas: GasMeter::new(tx.gas_limit),
            chain: ChainContext {
                block_number: self.height(),
                block_time: tx.timestamp,
                difficulty: self.tip().header.difficulty,
                block_gas_limit: tx.gas_limit,
                chain_id: self.config.chain_id,
                block_hash: self.tip().hash,
            },
            last_return_data: Vec::new(),
        };

        let mut host = LiveHost { state: &mut self.state, balances: &mut self.balances };
        let receipt = backend.execute(ctx, &mut host)?;
        if receipt.status == ExecStatus::Fail {
            return Err(SynnergyError::StateViolation(
                receipt.error.clone().unwrap_or_else(|| "contract call failed".into()),
            ));
        }
        Ok(receipt)
    }

    fn write_wal_line(&mut self, block: &Block) -> Result<()> {
        let line = serde_json::to_string(block)?;
        let wal = self.wal.as_mut().ok_or_else(|| SynnergyError::IOFailure("WAL not open".into()))?;
        writeln!(wal, "{line}").map_err(|e| SynnergyError::IOFailure(format!("WAL write failed: {e}")))?;
        wal.flush().map_err(|e| SynnergyError::IOFailure(format!("WAL flush failed: {e}")))?;
        wal.sync_all().map_err(|e| SynnergyError::IOFailure(format!("WAL fsync failed: {e}")))?;
        Ok(())
    }

    fn rewrite_wal(&mut self) -> Result<()> {
        let wal_path = self.dir.join(WAL_FILE);
        let mut file = File::create(&wal_path)?;
        for block in self.chain.iter().skip(1) {
            let line = serde_json::to_string(block)?;
            writeln!(file, "{line}")?;
        }
        file.sync_all()?;
        self.wal = Some(OpenOptions::new().append(true).open(&wal_path)?);
        Ok(())
    }

    fn truncate_wal(&mut self) -> Result<()> {
        let wal_path = self.dir.join(WAL_FILE);
        File::create(&wal_path)?;
        self.wal = Some(OpenOptions::new().append(true).open(&wal_path)?);
        Ok(())
    }

    /// Full canonical snapshot of the ledger state (spec §4.1 `snapshot()`).
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            chain: self.chain.clone(),
            pruned_count: self.pruned_count,
            state_entries: self.state.prefix_iter(&[]).map(|(k, v)| StateEntry { key: k.clone(), value: v.clone() }).collect(),
            balance_entries: self
                .balances
                .iter_balances()
                .map(|(token, address, amount)| BalanceEntry { token, address, amount })
                .collect(),
            supply_entries: self.balances.iter_supply().map(|(token, amount)| SupplyEntry { token, amount }).collect(),
            lp_balance_entries: self
                .lp_balances
                .iter_balances()
                .map(|(token, address, amount)| BalanceEntry { token, address, amount })
                .collect(),
            lp_supply_entries: self.lp_balances.iter_supply().map(|(token, amount)| SupplyEntry { token, amount }).collect(),
            utxo_entries: self.utxos.iter().map(|(op, out)| UtxoEntry { out_point: op.clone(), output: out.clone() }).collect(),
            nonces: self.nonces.iter().map(|(&addr, &n)| (addr, n)).collect(),
            contracts: self.contracts.values().cloned().collect(),
        }
    }

    fn restore_snapshot(&mut self, snapshot: LedgerSnapshot) {
        self.chain = snapshot.chain;
        self.pruned_count = snapshot.pruned_count;
        self.state = StateStore::new();
        for entry in snapshot.state_entries {
            self.state.put(entry.key, entry.value);
        }
        self.balances = BalanceTable::new();
        for entry in snapshot.balance_entries {
            self.balances.set_balance(entry.token, entry.address, entry.amount);
        }
        for entry in snapshot.supply_entries {
            self.balances.set_supply(entry.token, entry.amount);
        }
        self.lp_balances = BalanceTable::new();
        for entry in snapshot.lp_balance_entries {
            self.lp_balances.set_balance(entry.token, entry.address, entry.amount);
        }
        for entry in snapshot.lp_supply_entries {
            self.lp_balances.set_supply(entry.token, entry.amount);
        }
        self.utxos = UtxoSet::new();
        for entry in snapshot.utxo_entries {
            self.utxos.insert(entry.out_point, entry.output);
        }
        self.nonces = snapshot.nonces.into_iter().collect();
        self.contracts = snapshot.contracts.into_iter().map(|c| (c.address, c)).collect();
    }

    fn write_snapshot(&self) -> Result<()> {
        let snapshot = self.snapshot();
        let bytes = serde_json::to_vec(&snapshot)?;
        fs::write(self.dir.join(SNAPSHOT_FILE), bytes)?;
        self.mirror_state_to_kv()?;
        Ok(())
    }

    /// Replace the sled mirror's contents with the current `state` map.
    fn mirror_state_to_kv(&self) -> Result<()> {
        self.kv.clear().map_err(|e| SynnergyError::IOFailure(format!("state_db clear failed: {e}")))?;
        for (key, value) in self.state.prefix_iter(&[]) {
            self.kv
                .insert(key.as_slice(), value.as_slice())
                .map_err(|e| SynnergyError::IOFailure(format!("state_db write failed: {e}")))?;
        }
        self.kv.flush().map_err(|e| SynnergyError::IOFailure(format!("state_db flush failed: {e}")))?;
        Ok(())
    }

    /// Rebuild `state` from the sled mirror when `snap.json` is absent
    /// (first open, or a snapshot write that failed after the WAL rotated).
    fn hydrate_state_from_kv(&mut self) -> Result<()> {
        for entry in self.kv.iter() {
            let (key, value) = entry.map_err(|e| SynnergyError::IOFailure(format!("state_db read failed: {e}")))?;
            self.state.put(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    /// Archive every block below the retention window (gzip-append one
    /// serialised block per line) and evict it from memory (spec §4.1, §8
    /// scenario 4: "Pruning archive").
    fn prune(&mut self) -> Result<()> {
        let retain_from = self.chain_len().saturating_sub(self.config.retention);
        let local_cutoff = (retain_from.saturating_sub(self.pruned_count)) as usize;
        if local_cutoff == 0 {
            return Ok(());
        }
        let local_cutoff = local_cutoff.min(self.chain.len().saturating_sub(1));
        if local_cutoff == 0 {
            return Ok(());
        }

        let archive_path = self.dir.join(ARCHIVE_FILE);
        let to_archive: Vec<&Block> = self.chain[..local_cutoff].iter().collect();

        let file = OpenOptions::new().create(true).append(true).open(&archive_path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        for block in &to_archive {
            let line = serde_json::to_string(block)?;
            writeln!(encoder, "{line}").map_err(|e| SynnergyError::IOFailure(format!("archive write failed: {e}")))?;
        }
        encoder.finish().map_err(|e| SynnergyError::IOFailure(format!("archive flush failed: {e}")))?;

        self.chain.drain(..local_cutoff);
        self.pruned_count += local_cutoff as u64;
        self.rewrite_wal()?;
        Ok(())
    }
}

fn first_consumed_outpoint(tx: &Transaction) -> Option<OutPoint> {
    if tx.tx_type == crate::transaction::TransactionType::Reversal {
        tx.original_tx_hash.map(|hash| OutPoint { tx_hash: hash, index: 0 })
    } else {
        None
    }
}

/// [`Host`] implementation backing a read-only [`Ledger::call`]: operates on
/// a clone of ledger state, so nothing it does is ever persisted.
struct CallHost {
    state: StateStore,
    balances: BalanceTable,
}

impl Host for CallHost {
    fn get_balance(&self, token_symbol: &str, address: Address) -> u64 {
        self.balances.balance_of(TokenId::from_code(token_symbol), address)
    }

    fn transfer(&mut self, token_symbol: &str, from: Address, to: Address, amount: u64) -> Result<()> {
        self.balances.transfer(TokenId::from_code(token_symbol), from, to, amount)
    }

    fn state_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.get(key).cloned()
    }

    fn state_put(&mut self, key: &[u8], value: &[u8]) {
        self.state.put(key.to_vec(), value.to_vec());
    }

    fn emit_log(&mut self, _address: Address, _topics: Vec<Hash>, _data: Vec<u8>) {}
}

/// [`Host`] implementation backing committed `ContractCall` execution:
/// borrows the ledger's live `state`/`balances` directly, so writes and
/// transfers the VM makes are real (spec §2, §4.1).
struct LiveHost<'a> {
    state: &'a mut StateStore,
    balances: &'a mut BalanceTable,
}

impl Host for LiveHost<'_> {
    fn get_balance(&self, token_symbol: &str, address: Address) -> u64 {
        self.balances.balance_of(TokenId::from_code(token_symbol), address)
    }

    fn transfer(&mut self, token_symbol: &str, from: Address, to: Address, amount: u64) -> Result<()> {
        self.balances.transfer(TokenId::from_code(token_symbol), from, to, amount)
    }

    fn state_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.get(key).cloned()
    }

    fn state_put(&mut self, key: &[u8], value: &[u8]) {
        self.state.put(key.to_vec(), value.to_vec());
    }

    fn emit_log(&mut self, _address: Address, _topics: Vec<Hash>, _data: Vec<u8>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LedgerConfig {
        LedgerConfig {
            snapshot_interval: 100,
            prune_interval: 2,
            retention: 2,
            fee_pools: FeePools {
                miner: Address::derive(b"miner"),
                pos_validator_pool: Address::derive(b"pos"),
                poh_validator_pool: Address::derive(b"poh"),
                identity_token_holders: Address::derive(b"identity"),
                loan_pool: Address::derive(b"loan"),
                charity_pool: Address::derive(b"charity"),
                authority_nodes: Address::derive(b"authority"),
            },
            fee_token: TokenId::from_code("SYNN"),
            max_supply: None,
            chain_id: 1,
        }
    }

    fn next_block(ledger: &Ledger, txs: Vec<Transaction>) -> Block {
        Block::new(ledger.height() + 1, ledger.tip().hash, vec![], 0, txs)
    }

    #[test]
    fn genesis_height_is_zero_rejects_mismatched_height() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        assert_eq!(ledger.height(), 0);
        let bad = Block::new(2, ledger.tip().hash, vec![], 0, vec![]);
        assert!(ledger.add_block(bad).is_err());
        assert_eq!(ledger.chain_len(), 1);
    }

    #[test]
    fn duplicate_sub_block_height_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        let sb = SubBlock { header: crate::block::SubBlockHeader { height: 0 }, body: vec![] };
        ledger.append_sub_block(sb.clone()).unwrap();
        assert!(ledger.append_sub_block(sb).is_err());
    }

    #[test]
    fn add_block_applies_token_transfers_and_fees() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        let token = TokenId::from_code("SYNN");
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        ledger.balances_mut().mint(token, alice, 1000, None).unwrap();
        let supply_before = ledger.balances().total_supply(token);

        let tx = Transaction::new(
            crate::transaction::TransactionType::Payment,
            alice,
            bob,
            0,
            0,
            21000,
            1,
            vec![],
        )
        .unwrap()
        .with_token_transfers(vec![crate::transaction::TokenTransfer { token, from: alice, to: bob, amount: 100 }])
        .unwrap();
        let fee = tx.fee();

        let block = next_block(&ledger, vec![tx]);
        ledger.add_block(block).unwrap();

        assert_eq!(ledger.balances().balance_of(token, bob), 100);
        assert_eq!(ledger.balances().balance_of(token, alice), 1000 - 100 - fee);
        assert_eq!(ledger.height(), 1);

        // Fees move existing balance into the pools; total supply never grows.
        assert_eq!(ledger.balances().total_supply(token), supply_before);
        assert_eq!(ledger.balances().sum_balances(token), supply_before);
    }

    #[test]
    fn add_block_rejects_a_fee_the_sender_cannot_cover_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        let token = TokenId::from_code("SYNN");
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        // Enough for the token transfer but nothing left over for the fee.
        ledger.balances_mut().mint(token, alice, 100, None).unwrap();

        let tx = Transaction::new(
            crate::transaction::TransactionType::Payment,
            alice,
            bob,
            0,
            0,
            21000,
            1,
            vec![],
        )
        .unwrap()
        .with_token_transfers(vec![crate::transaction::TokenTransfer { token, from: alice, to: bob, amount: 100 }])
        .unwrap();

        let block = next_block(&ledger, vec![tx]);
        assert!(ledger.add_block(block).is_err());
        assert_eq!(ledger.height(), 0);
        assert_eq!(ledger.balances().balance_of(token, alice), 100);
        assert_eq!(ledger.balances().balance_of(token, bob), 0);
    }

    #[test]
    fn contract_call_runs_through_the_light_vm_and_mutates_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        let token = TokenId::from_code("SYNN");
        let deployer = Address::derive(b"deployer");
        ledger.balances_mut().mint(token, deployer, 1_000_000, None).unwrap();

        // PUSH 7 (value), PUSH 42 (key), SSTORE, padded past the Light
        // threshold (>= 100 bytes) with trailing STOPs.
        let mut bytecode = vec![0x3C, 1, 7, 0x3C, 1, 42, 0x41];
        bytecode.resize(150, 0x00);

        let deploy_tx = Transaction::new(
            crate::transaction::TransactionType::Payment,
            deployer,
            deployer,
            0,
            0,
            21000,
            1,
            vec![],
        )
        .unwrap()
        .with_contract_deploy(crate::transaction::ContractDeploy { bytecode: bytecode.clone() })
        .unwrap();

        let contract_address = crate::contract::Contract::new(deployer, 0, bytecode).address;

        let deploy_block = next_block(&ledger, vec![deploy_tx]);
        ledger.add_block(deploy_block).unwrap();

        let call_tx = Transaction::new(
            crate::transaction::TransactionType::ContractCall,
            deployer,
            contract_address,
            0,
            1,
            21000,
            1,
            vec![],
        )
        .unwrap();

        let call_block = next_block(&ledger, vec![call_tx]);
        ledger.add_block(call_block).unwrap();

        let mut key = [0u8; 32];
        key[31] = 42;
        let mut expected_value = [0u8; 32];
        expected_value[31] = 7;
        assert_eq!(ledger.state().get(&key), Some(&expected_value.to_vec()));
    }

    #[test]
    fn contract_call_against_a_nonexistent_contract_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        let token = TokenId::from_code("SYNN");
        let caller = Address::derive(b"caller");
        ledger.balances_mut().mint(token, caller, 1_000_000, None).unwrap();

        let call_tx = Transaction::new(
            crate::transaction::TransactionType::ContractCall,
            caller,
            Address::derive(b"nowhere"),
            0,
            0,
            21000,
            1,
            vec![],
        )
        .unwrap();

        let block = next_block(&ledger, vec![call_tx]);
        assert!(ledger.add_block(block).is_err());
        assert_eq!(ledger.height(), 0);
    }

    #[test]
    fn pruning_archives_blocks_and_shrinks_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config();
        cfg.prune_interval = 1;
        cfg.retention = 1;
        let mut ledger = Ledger::open(dir.path(), cfg).unwrap();

        for _ in 0..3 {
            let block = next_block(&ledger, vec![]);
            ledger.add_block(block).unwrap();
        }

        assert_eq!(ledger.chain_len(), 4);
        assert!(ledger.chain.len() < 4);
        assert!(dir.path().join(ARCHIVE_FILE).exists());
        assert!(fs::metadata(dir.path().join(ARCHIVE_FILE)).unwrap().len() > 0);
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path(), config()).unwrap();
        ledger.state_mut().put(b"a".to_vec(), b"1".to_vec());
        let before_root = ledger.state_root();
        let snap = ledger.snapshot();
        let mut restored = Ledger::open(dir.path().join("other"), config()).unwrap();
        restored.restore_snapshot(snap);
        assert_eq!(restored.state_root(), before_root);
    }
}
