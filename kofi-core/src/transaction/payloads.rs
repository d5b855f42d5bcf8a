//! Ready-made payloads for the wallet's actions.

use crate::config::KOFI_COIN_TYPE;
use crate::error::{KofiError, Result};
use crate::transaction::abi::KOFI_LOTTERY_ADDRESS;
use crate::transaction::{EntryFunction, FunctionId, MoveValue};
use crate::types::AccountAddress;

/// Where café orders are paid to when no recipient is given.
pub const CAFE_ADDRESS: &str = "0x15fc9d4db533357da61c4e30341256c11636495f505cc2a48291ddbe0da83694";

const DEFAULT_POT: u64 = 0;

/// Transfer `amount` Kofi units to `recipient`, or to the café if none is given.
pub fn pay(recipient: Option<AccountAddress>, amount: u64) -> Result<EntryFunction> {
    if amount == 0 {
        return Err(KofiError::InvalidAmount(
            "Amount must be greater than 0".to_string(),
        ));
    }

    let recipient = match recipient {
        Some(address) => address,
        None => CAFE_ADDRESS.parse::<AccountAddress>()?,
    };

    Ok(EntryFunction::new(
        "0x1::aptos_account::transfer_coins".parse()?,
        vec![KOFI_COIN_TYPE.to_string()],
        vec![MoveValue::Address(recipient), MoveValue::U64(amount)],
    ))
}

/// Spin the lottery wheel for a pot.
pub fn spin(pot_id: Option<u64>, amount: Option<u64>) -> Result<EntryFunction> {
    Ok(EntryFunction::new(
        lottery_function("spin")?,
        vec![],
        vec![
            MoveValue::U64(pot_id.unwrap_or(DEFAULT_POT)),
            MoveValue::U64(amount.unwrap_or(1)),
        ],
    ))
}

/// Grant lottery tickets to `address` (admin only on chain).
pub fn give_tickets(address: AccountAddress, amount: Option<u64>) -> Result<EntryFunction> {
    Ok(EntryFunction::new(
        lottery_function("admin_add_tickets")?,
        vec![],
        vec![
            MoveValue::Address(address),
            MoveValue::U64(amount.filter(|a| *a > 0).unwrap_or(1)),
        ],
    ))
}

fn lottery_function(name: &str) -> Result<FunctionId> {
    format!("{}::lottery::{}", KOFI_LOTTERY_ADDRESS, name).parse()
}
