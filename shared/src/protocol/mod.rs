//! Wire protocol definitions
//!
//! This module defines the on-link frame layout exchanged with the NIC under
//! test. The header layout is fixed by the device, so it is encoded by hand
//! rather than through a serialization framework.

pub mod wire;
