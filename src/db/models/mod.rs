pub mod custom_value;

pub use custom_value::CustomValueRow;
