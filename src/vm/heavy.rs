//! Heavy backend: a sandboxed module runner for bytecode too large for the
//! stack interpreter (spec §4.2). Host capabilities (state read/write, gas
//! consumption, log emission) are exposed as named imports rather than the
//! Light VM's direct opcode dispatch. No sandbox runtime is wired in here —
//! this models the import surface and charges gas deterministically so the
//! rest of the ledger can exercise the backend split without a WASM engine
//! dependency, but the module that runs is the one installed as `ctx.code`,
//! not whatever the caller happened to pass as `input`.

use crate::error::{Result, SynnergyError};
use crate::gas::Op;

use super::{ExecStatus, ExecutionContext, Host, Receipt, VmBackend};

/// Marks a module as exporting `_start`. A heavy module is this magic
/// followed by a bincode-encoded call program; `ctx.input` only supplies
/// call arguments (currently unused by the program form below), never the
/// program itself.
const START_EXPORT_MAGIC: &[u8] = b"_start\0";

/// One call the loaded module makes into the host during its run, executed
/// in order against gas accounting. In a full sandbox this list is produced
/// by the runtime's import trampolines as the module runs; here it is the
/// module's body, decoded once up front.
#[derive(Debug, Clone)]
enum HostCall {
    Read { key: Vec<u8> },
    Write { key: Vec<u8>, value: Vec<u8> },
    Log { topics: Vec<crate::types::Hash>, data: Vec<u8> },
    Transfer { token: String, to: crate::types::Address, amount: u64 },
}

/// Validate that `code` exports `_start` and decode the call program that
/// follows the marker. A module missing the marker has no entry point and
/// cannot be run (spec §4.2: "invoke a `_start` export").
fn decode_module(code: &[u8]) -> Result<Vec<HostCall>> {
    let body = code
        .strip_prefix(START_EXPORT_MAGIC)
        .ok_or_else(|| SynnergyError::InvalidInput("heavy module does not export _start".into()))?;
    bincode::deserialize::<Vec<(u8, Vec<u8>, Vec<u8>)>>(body)
        .map(|raw| {
            raw.into_iter()
                .map(|(tag, a, b)| match tag {
                    0 => HostCall::Read { key: a },
                    1 => HostCall::Write { key: a, value: b },
                    2 => HostCall::Log {
                        topics: a.chunks_exact(32).map(crate::types::Hash::from_bytes).collect(),
                        data: b,
                    },
                    _ => HostCall::Transfer {
                        token: String::from_utf8_lossy(&a).into_owned(),
                        to: crate::types::Address::from_bytes(&b),
                        amount: u64::from_be_bytes(b.get(20..28).unwrap_or(&[0; 8]).try_into().unwrap_or([0; 8])),
                    },
                })
                .collect()
        })
        .map_err(|e| SynnergyError::SerializationError(e.to_string()))
}

pub struct HeavyVm;

impl VmBackend for HeavyVm {
    fn execute(&self, mut ctx: ExecutionContext<'_>, host: &mut dyn Host) -> Result<Receipt> {
        ctx.gas.consume(Op::ContractCreate)?;

        let calls = match decode_module(ctx.code) {
            Ok(c) => c,
            Err(err) => return Ok(Receipt::failure(ctx.gas.used, err.to_string())),
        };

        let mut logs = Vec::new();
        for call in calls {
            match call {
                HostCall::Read { key } => {
                    ctx.gas.consume(Op::SLoad)?;
                    let _ = host.state_get(&key);
                }
                HostCall::Write { key, value } => {
                    ctx.gas.consume(Op::SStore)?;
                    host.state_put(&key, &value);
                }
                HostCall::Log { topics, data } => {
                    ctx.gas.consume(Op::Log1)?;
                    host.emit_log(ctx.caller, topics.clone(), data.clone());
                    logs.push(super::LogEntry { address: ctx.caller, topics, data });
                }
                HostCall::Transfer { token, to, amount } => {
                    ctx.gas.consume(Op::TokenTransfer)?;
                    if let Err(err) = host.transfer(&token, ctx.caller, to, amount) {
                        return Ok(Receipt {
                            status: ExecStatus::Fail,
                            gas_used: ctx.gas.used,
                            return_data: Vec::new(),
                            logs: Vec::new(),
                            error: Some(format!("host import failed: {err}")),
                        });
                    }
                }
            }
        }

        Ok(Receipt::success(ctx.gas.used, ctx.last_return_data, logs))
    }
}
