//! Facade bookkeeping: limit checks, the live-allocation registry and the
//! shared per-facade state.

pub(crate) mod budget;
pub(crate) mod registry;
pub(crate) mod state;
