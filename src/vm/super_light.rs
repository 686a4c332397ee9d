//! Super-light backend: verifies that the SHA-256 of the bytecode matches
//! the transaction hash. No state mutation; always zero gas (spec §4.2).

use crate::error::Result;
use crate::types::Hash;

use super::{ExecStatus, ExecutionContext, Host, Receipt, VmBackend};

pub struct SuperLightVm;

impl VmBackend for SuperLightVm {
    fn execute(&self, ctx: ExecutionContext<'_>, _host: &mut dyn Host) -> Result<Receipt> {
        let digest = Hash::of(ctx.code);
        if digest == ctx.tx_hash {
            Ok(Receipt::success(0, Vec::new(), Vec::new()))
        } else {
            Ok(Receipt { status: ExecStatus::Fail, gas_used: 0, return_data: Vec::new(), logs: Vec::new(), error: Some("code hash does not match transaction hash".into()) })
        }
    }
}
