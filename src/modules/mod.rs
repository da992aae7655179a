//! Payload builders and deployment flows, one module per on-chain module.

pub mod coin;
pub mod farm;
pub mod passport_mine;
pub mod passport_mine_legacy;
pub mod passport_mint;
pub mod passport_stake;
pub mod presale;
pub mod token;
