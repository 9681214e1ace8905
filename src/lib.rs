mod address;
mod config;
mod conflict;
mod diff;
mod error;
mod faults;
mod injector;
mod patch;

pub mod prelude {
    pub use crate::address::{parse_address, parse_int, AddressSet};
    pub use crate::config::{read_fault_file, Architecture, Args, Config, ExecConfig};
    pub use crate::conflict::check_conflicts;
    pub use crate::diff::{print_diff, render_diff};
    pub use crate::error::FaultError;
    pub use crate::faults::*;
    pub use crate::injector::{group_tokens, parse_fault_models, FaultInjector};
    pub use crate::patch::{apply_all, apply_faults};
}
