//! Entry function signatures used to reject malformed operations before any
//! chain round trip.

use crate::error::{KofiError, Result};
use crate::transaction::{is_identifier, EntryFunction, FunctionId, MoveType};
use crate::types::AccountAddress;
use std::collections::HashMap;

/// Module address of the Kofi lottery contract.
pub const KOFI_LOTTERY_ADDRESS: &str =
    "0x42d3d74c53601215495bff2346890198713f7df3758e165018474b04055a2d52";

/// Parameter list of an entry function, excluding the leading `&signer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFunctionAbi {
    pub generic_type_params: usize,
    pub params: Vec<MoveType>,
}

impl EntryFunctionAbi {
    pub fn new(generic_type_params: usize, params: Vec<MoveType>) -> Self {
        Self {
            generic_type_params,
            params,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    functions: HashMap<FunctionId, EntryFunctionAbi>,
}

impl AbiRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The functions the wallet calls: coin transfers and the lottery.
    pub fn kofi() -> Self {
        let framework = AccountAddress::new({
            let mut bytes = [0u8; 32];
            bytes[31] = 1;
            bytes
        });
        let lottery: AccountAddress = KOFI_LOTTERY_ADDRESS
            .parse()
            .unwrap_or(AccountAddress::ZERO);

        let mut registry = Self::empty();
        registry.register(
            FunctionId::new(framework, "aptos_account", "transfer"),
            EntryFunctionAbi::new(0, vec![MoveType::Address, MoveType::U64]),
        );
        registry.register(
            FunctionId::new(framework, "aptos_account", "transfer_coins"),
            EntryFunctionAbi::new(1, vec![MoveType::Address, MoveType::U64]),
        );
        registry.register(
            FunctionId::new(lottery, "lottery", "spin"),
            EntryFunctionAbi::new(0, vec![MoveType::U64, MoveType::U64]),
        );
        registry.register(
            FunctionId::new(lottery, "lottery", "create_new_pot"),
            EntryFunctionAbi::new(0, vec![MoveType::U64, MoveType::U64]),
        );
        registry.register(
            FunctionId::new(lottery, "lottery", "admin_add_tickets"),
            EntryFunctionAbi::new(0, vec![MoveType::Address, MoveType::U64]),
        );
        registry
    }

    pub fn register(&mut self, function: FunctionId, abi: EntryFunctionAbi) {
        self.functions.insert(function, abi);
    }

    pub fn get(&self, function: &FunctionId) -> Option<&EntryFunctionAbi> {
        self.functions.get(function)
    }

    /// Check a payload's type arguments and arguments against its registered signature.
    pub fn validate(&self, payload: &EntryFunction) -> Result<()> {
        let abi = self.get(&payload.function).ok_or_else(|| {
            KofiError::invalid_operation(format!("No ABI registered for {}", payload.function))
        })?;

        if payload.type_arguments.len() != abi.generic_type_params {
            return Err(KofiError::invalid_operation(format!(
                "{} expects {} type argument(s), got {}",
                payload.function,
                abi.generic_type_params,
                payload.type_arguments.len()
            )));
        }

        for tag in &payload.type_arguments {
            validate_struct_tag(tag)?;
        }

        if payload.arguments.len() != abi.params.len() {
            return Err(KofiError::invalid_operation(format!(
                "{} expects {} argument(s), got {}",
                payload.function,
                abi.params.len(),
                payload.arguments.len()
            )));
        }

        for (index, (value, ty)) in payload.arguments.iter().zip(&abi.params).enumerate() {
            if !value.matches(ty) {
                return Err(KofiError::invalid_operation(format!(
                    "{} argument {} must be {}, got {:?}",
                    payload.function, index, ty, value
                )));
            }
        }

        Ok(())
    }
}

fn validate_struct_tag(tag: &str) -> Result<()> {
    let parts: Vec<&str> = tag.split("::").collect();
    let valid = parts.len() == 3
        && parts[0].parse::<AccountAddress>().is_ok()
        && is_identifier(parts[1])
        && is_identifier(parts[2]);

    if valid {
        Ok(())
    } else {
        Err(KofiError::invalid_operation(format!("Invalid type argument: {}", tag)))
    }
}
