//! Hibernation service
//!
//! Saves the used parts of volatile memory into GPM before standby or shutdown and restores them
//! at warm boot. With the `shutdown` feature, images can also be moved into a flash partition,
//! since GPM itself is not powered in shutdown.
#![no_std]
#![warn(missing_docs)]

pub mod boot;
pub mod engine;
pub mod flash;
pub mod free_block;
pub mod image;
pub mod memory;

#[cfg(test)]
mod testing;

pub use boot::{BootOutcome, restore_on_boot};
pub use engine::HibernationEngine;
pub use flash::NoFlash;
pub use free_block::{BlockKind, FreeBlock, FreeBlockList};
pub use memory::{OutOfRange, Region, VolatileMemory};
