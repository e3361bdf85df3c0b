// Licensed under the Apache-2.0 license

//! ISA descriptions shared by the compliance targets: register width, the
//! single-letter extension set of a hart and the trap-value relocation mask
//! every target compiles tests with.

mod profile;
mod tval;

pub use profile::{IsaProfile, IsaSpecError, Xlen};
pub use tval::{relocation_define, relocation_mask, TrapCause, RELOCATED_CAUSES, SET_REL_TVAL_MSK};
