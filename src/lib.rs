pub mod bank;
pub mod envelope; // ADSR/DAHD/ADAR/DAHDSR stage machines
pub mod matrix; // Data-driven modulation routing
pub mod smooth; // Click-free value smoothing and lag

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
