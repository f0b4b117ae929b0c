// src/streams/extractor.rs
//! Recognizes AMM pool-creation instructions in streamed transactions.

use crate::dex::Pool;
use crate::streams::layout::{AccountRole, InstructionLayout, LayoutRegistry};
use crate::streams::transaction::{InstructionView, TransactionView};
use log::{debug, info, warn};
use solana_sdk::pubkey::Pubkey;

pub struct PoolCreationExtractor {
    layouts: LayoutRegistry,
    anchor_mint: Pubkey,
}

impl PoolCreationExtractor {
    pub fn new(layouts: LayoutRegistry, anchor_mint: Pubkey) -> Self {
        Self {
            layouts,
            anchor_mint,
        }
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    /// Returns the first pool creation found in `tx`.
    ///
    /// The returned pool is canonicalized like snapshot pools. When neither
    /// mint is the anchor, `base_mint`/`quote_mint` are left empty and the
    /// vaults keep the instruction's coin/pc order.
    pub fn extract(&self, tx: &TransactionView) -> Option<Pool> {
        for ix in &tx.instructions {
            let Some(program_id) = tx.program_id(ix) else { continue };
            let Some(layout) = self.layouts.find(program_id, ix.discriminator()) else { continue };

            match self.decode(tx, ix, layout) {
                Some(pool) => return Some(pool),
                None => {
                    warn!(
                        "{} instruction in {} references accounts outside the key table",
                        layout.name, tx.signature
                    );
                }
            }
        }
        debug!("No pool creation in {}", tx.signature);
        None
    }

    fn decode(&self, tx: &TransactionView, ix: &InstructionView, layout: &InstructionLayout) -> Option<Pool> {
        let account = |role: AccountRole| tx.instruction_account(ix, layout.roles.position(role));

        let pool_id = account(AccountRole::Pool)?;
        let coin_mint = account(AccountRole::CoinMint)?;
        let pc_mint = account(AccountRole::PcMint)?;
        let coin_vault = account(AccountRole::CoinVault)?;
        let pc_vault = account(AccountRole::PcVault)?;

        let raw = Pool {
            id: pool_id.to_string(),
            program_id: layout.program_id.to_string(),
            base_mint: coin_mint.to_string(),
            quote_mint: pc_mint.to_string(),
            base_vault: coin_vault.to_string(),
            quote_vault: pc_vault.to_string(),
        };

        match raw.clone().canonicalize(&self.anchor_mint.to_string()) {
            Some(pool) => Some(pool),
            None => {
                info!(
                    "Pool {} created without anchor side (coin {}, pc {})",
                    raw.id, raw.base_mint, raw.quote_mint
                );
                Some(Pool {
                    base_mint: String::new(),
                    quote_mint: String::new(),
                    ..raw
                })
            }
        }
    }
}
