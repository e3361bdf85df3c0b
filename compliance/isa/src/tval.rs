// Licensed under the Apache-2.0 license

/// Name of the arch-test macro selecting which exception causes report a
/// relocated trap value.
pub const SET_REL_TVAL_MSK: &str = "SET_REL_TVAL_MSK";

/// Synchronous exception causes as named by the arch-test environment headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCause {
    MisalignedFetch,
    FetchAccess,
    Breakpoint,
    MisalignedLoad,
    LoadAccess,
    MisalignedStore,
    StoreAccess,
    FetchPageFault,
    LoadPageFault,
    StorePageFault,
}

impl TrapCause {
    pub fn macro_name(self) -> &'static str {
        match self {
            TrapCause::MisalignedFetch => "CAUSE_MISALIGNED_FETCH",
            TrapCause::FetchAccess => "CAUSE_FETCH_ACCESS",
            TrapCause::Breakpoint => "CAUSE_BREAKPOINT",
            TrapCause::MisalignedLoad => "CAUSE_MISALIGNED_LOAD",
            TrapCause::LoadAccess => "CAUSE_LOAD_ACCESS",
            TrapCause::MisalignedStore => "CAUSE_MISALIGNED_STORE",
            TrapCause::StoreAccess => "CAUSE_STORE_ACCESS",
            TrapCause::FetchPageFault => "CAUSE_FETCH_PAGE_FAULT",
            TrapCause::LoadPageFault => "CAUSE_LOAD_PAGE_FAULT",
            TrapCause::StorePageFault => "CAUSE_STORE_PAGE_FAULT",
        }
    }
}

/// Causes whose trap value the DUT relocates. The DUT clears `mtval` on
/// EBREAK (permitted by the privileged spec), so `Breakpoint` is never listed.
pub const RELOCATED_CAUSES: [TrapCause; 9] = [
    TrapCause::MisalignedFetch,
    TrapCause::FetchAccess,
    TrapCause::MisalignedLoad,
    TrapCause::LoadAccess,
    TrapCause::MisalignedStore,
    TrapCause::StoreAccess,
    TrapCause::FetchPageFault,
    TrapCause::LoadPageFault,
    TrapCause::StorePageFault,
];

/// The mask expression, e.g. `((1<<CAUSE_MISALIGNED_FETCH) | ...) & 0xFFFFFFFF)`.
pub fn relocation_mask() -> String {
    let terms: Vec<String> = RELOCATED_CAUSES
        .iter()
        .map(|cause| format!("(1<<{})", cause.macro_name()))
        .collect();
    format!("(({}) & 0xFFFFFFFF)", terms.join(" | "))
}

/// Compiler define overriding the environment's default mask.
pub fn relocation_define() -> String {
    format!("-D{}={}", SET_REL_TVAL_MSK, relocation_mask())
}
