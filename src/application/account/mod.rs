//! Account use cases: guarded cascading deletion.

mod delete_account;

pub use delete_account::{
    DeleteAccountCommand, DeleteAccountHandler, DeleteAccountResult, DeletionError,
};
