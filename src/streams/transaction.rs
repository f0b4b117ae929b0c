// src/streams/transaction.rs
//! Transport-independent view of a streamed transaction.

use crate::error::SyncError;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use yellowstone_grpc_proto::prelude::{CompiledInstruction, SubscribeUpdateTransaction};

/// Decoded transaction: resolved account table plus top-level instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionView {
    pub signature: String,
    pub slot: u64,
    /// Static keys followed by lookup-table loaded addresses (writable, then
    /// readonly), the order instruction indexes refer to.
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<InstructionView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionView {
    pub program_id_index: u32,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

impl From<CompiledInstruction> for InstructionView {
    fn from(ix: CompiledInstruction) -> Self {
        Self {
            program_id_index: ix.program_id_index,
            accounts: ix.accounts,
            data: ix.data,
        }
    }
}

impl InstructionView {
    pub fn discriminator(&self) -> Option<u8> {
        self.data.first().copied()
    }
}

impl TransactionView {
    pub fn program_id(&self, ix: &InstructionView) -> Option<&Pubkey> {
        self.account_keys.get(ix.program_id_index as usize)
    }

    /// Resolves the `position`-th account of `ix` through the key table.
    pub fn instruction_account(&self, ix: &InstructionView, position: usize) -> Option<&Pubkey> {
        let index = *ix.accounts.get(position)?;
        self.account_keys.get(index as usize)
    }

    /// Decodes a Geyser transaction update.
    ///
    /// `Ok(None)` when the update carries no transaction message. Malformed
    /// account keys are a decode error.
    pub fn from_update(update: SubscribeUpdateTransaction) -> Result<Option<Self>, SyncError> {
        let slot = update.slot;
        let Some(info) = update.transaction else { return Ok(None) };
        let Some(transaction) = info.transaction else { return Ok(None) };
        let Some(message) = transaction.message else { return Ok(None) };

        let signature = Signature::try_from(info.signature.as_slice())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let loaded = info
            .meta
            .map(|meta| {
                let mut keys = meta.loaded_writable_addresses;
                keys.extend(meta.loaded_readonly_addresses);
                keys
            })
            .unwrap_or_default();

        let account_keys = message
            .account_keys
            .iter()
            .chain(loaded.iter())
            .map(|bytes| {
                Pubkey::try_from(bytes.as_slice()).map_err(|_| {
                    SyncError::Decode(format!(
                        "account key of {} bytes in transaction {}",
                        bytes.len(),
                        signature
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            signature,
            slot,
            account_keys,
            instructions: message.instructions.into_iter().map(Into::into).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yellowstone_grpc_proto::prelude::{
        Message, SubscribeUpdateTransactionInfo, Transaction, TransactionStatusMeta,
    };

    fn update(account_keys: Vec<Vec<u8>>, meta: Option<TransactionStatusMeta>) -> SubscribeUpdateTransaction {
        SubscribeUpdateTransaction {
            transaction: Some(SubscribeUpdateTransactionInfo {
                signature: vec![7u8; 64],
                transaction: Some(Transaction {
                    message: Some(Message {
                        account_keys,
                        instructions: vec![CompiledInstruction {
                            program_id_index: 1,
                            accounts: vec![0, 2],
                            data: vec![1, 9, 9],
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                meta,
                ..Default::default()
            }),
            slot: 42,
        }
    }

    #[test]
    fn test_decodes_keys_and_instructions() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let view = TransactionView::from_update(update(vec![a.to_bytes().to_vec(), b.to_bytes().to_vec()], None))
            .unwrap()
            .unwrap();
        assert_eq!(view.slot, 42);
        assert_eq!(view.account_keys, vec![a, b]);
        assert_eq!(view.instructions.len(), 1);
        assert_eq!(view.instructions[0].discriminator(), Some(1));
        assert_eq!(view.program_id(&view.instructions[0]), Some(&b));
        assert_eq!(view.instruction_account(&view.instructions[0], 0), Some(&a));
        // index 2 is past the key table
        assert_eq!(view.instruction_account(&view.instructions[0], 1), None);
        assert!(!view.signature.is_empty());
    }

    #[test]
    fn test_appends_loaded_addresses_after_static_keys() {
        let static_key = Pubkey::new_unique();
        let writable = Pubkey::new_unique();
        let readonly = Pubkey::new_unique();
        let meta = TransactionStatusMeta {
            loaded_writable_addresses: vec![writable.to_bytes().to_vec()],
            loaded_readonly_addresses: vec![readonly.to_bytes().to_vec()],
            ..Default::default()
        };
        let view = TransactionView::from_update(update(vec![static_key.to_bytes().to_vec()], Some(meta)))
            .unwrap()
            .unwrap();
        assert_eq!(view.account_keys, vec![static_key, writable, readonly]);
    }

    #[test]
    fn test_malformed_key_is_decode_error() {
        let result = TransactionView::from_update(update(vec![vec![1, 2, 3]], None));
        assert!(matches!(result, Err(SyncError::Decode(_))));
    }

    #[test]
    fn test_update_without_message_is_skipped() {
        let empty = SubscribeUpdateTransaction {
            transaction: None,
            slot: 1,
        };
        assert_eq!(TransactionView::from_update(empty).unwrap(), None);
    }
}
