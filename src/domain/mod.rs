// Domain layer: versions, constraints, verdicts and ports. No I/O here.

pub mod model;
pub mod ports;
pub mod requirements;
pub mod rpm;
pub mod status;
pub mod version;
