mod fs_utils;
mod layout;
mod receipts;
mod registry;

pub use layout::{default_host_prefix, HostLayout, PREFIX_ENV};
pub use receipts::{
    current_unix_timestamp, read_component_receipt, read_component_receipts,
    write_component_receipt, ComponentReceipt,
};
pub use registry::HostRegistry;
