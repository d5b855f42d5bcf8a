pub mod balance;
pub mod key;
pub mod transaction;

pub use balance::handle_balance_command;
pub use key::{handle_key_command, KeyCommands};
pub use transaction::{
    handle_order, handle_send, handle_spin, handle_status, handle_wait, SubmitOptions,
};
