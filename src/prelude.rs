//! Universal imports for this crate.

pub use std::{sync::Arc, time::Duration};

pub use crate::{error, info, trace_packet, trace_shutdown, warning};
