// src/streams/layout.rs
//! Declarative instruction layouts: which program + opcode creates a pool and
//! where each named account sits in the instruction's account list.

use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Pool,
    CoinMint,
    PcMint,
    CoinVault,
    PcVault,
}

/// Positions of each role inside `CompiledInstruction::accounts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRoles {
    pub pool: usize,
    pub coin_mint: usize,
    pub pc_mint: usize,
    pub coin_vault: usize,
    pub pc_vault: usize,
}

impl AccountRoles {
    pub fn position(&self, role: AccountRole) -> usize {
        match role {
            AccountRole::Pool => self.pool,
            AccountRole::CoinMint => self.coin_mint,
            AccountRole::PcMint => self.pc_mint,
            AccountRole::CoinVault => self.coin_vault,
            AccountRole::PcVault => self.pc_vault,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionLayout {
    pub name: &'static str,
    pub program_id: Pubkey,
    pub discriminator: u8,
    pub roles: AccountRoles,
}

impl InstructionLayout {
    /// Raydium AMM v4 `initialize2`.
    ///
    /// Accounts: 0 token program, 1 associated token program, 2 system program,
    /// 3 rent, 4 amm, 5 amm authority, 6 open orders, 7 lp mint, 8 coin mint,
    /// 9 pc mint, 10 coin vault, 11 pc vault, ...
    pub fn raydium_amm_initialize2(program_id: Pubkey) -> Self {
        Self {
            name: "raydium_amm_v4::initialize2",
            program_id,
            discriminator: 1,
            roles: AccountRoles {
                pool: 4,
                coin_mint: 8,
                pc_mint: 9,
                coin_vault: 10,
                pc_vault: 11,
            },
        }
    }

    pub fn matches(&self, program_id: &Pubkey, discriminator: Option<u8>) -> bool {
        self.program_id == *program_id && discriminator == Some(self.discriminator)
    }
}

/// Ordered set of layouts; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: Vec<InstructionLayout>,
}

impl LayoutRegistry {
    pub fn new(layouts: Vec<InstructionLayout>) -> Self {
        Self { layouts }
    }

    pub fn register(&mut self, layout: InstructionLayout) {
        self.layouts.push(layout);
    }

    pub fn find(&self, program_id: &Pubkey, discriminator: Option<u8>) -> Option<&InstructionLayout> {
        self.layouts
            .iter()
            .find(|layout| layout.matches(program_id, discriminator))
    }

    pub fn program_ids(&self) -> Vec<Pubkey> {
        let mut ids: Vec<Pubkey> = self.layouts.iter().map(|l| l.program_id).collect();
        ids.dedup();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize2_positions() {
        let layout = InstructionLayout::raydium_amm_initialize2(Pubkey::new_unique());
        assert_eq!(layout.roles.position(AccountRole::Pool), 4);
        assert_eq!(layout.roles.position(AccountRole::CoinMint), 8);
        assert_eq!(layout.roles.position(AccountRole::PcMint), 9);
        assert_eq!(layout.roles.position(AccountRole::CoinVault), 10);
        assert_eq!(layout.roles.position(AccountRole::PcVault), 11);
    }

    #[test]
    fn test_registry_matches_program_and_opcode() {
        let amm = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let mut registry = LayoutRegistry::default();
        assert!(registry.is_empty());
        registry.register(InstructionLayout::raydium_amm_initialize2(amm));

        assert!(registry.find(&amm, Some(1)).is_some());
        assert!(registry.find(&amm, Some(0)).is_none());
        assert!(registry.find(&amm, None).is_none());
        assert!(registry.find(&other, Some(1)).is_none());
        assert_eq!(registry.program_ids(), vec![amm]);
    }
}
