//! Convert archive records exported from other password managers.
pub mod convert;
pub mod encrypt;
pub mod pif;

pub use convert::{map_record, MapOutcome};
pub use encrypt::encrypt_fields;
