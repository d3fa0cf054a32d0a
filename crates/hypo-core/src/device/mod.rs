mod paired_device;
mod platform;

pub use paired_device::{LastSuccessfulTransport, PairedDevice};
pub use platform::Platform;
