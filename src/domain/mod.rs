// Domain layer: code records and the ports the pipelines depend on.

pub mod model;
pub mod ports;
