// Domain layer: records, the query shape and the ports the feed talks through.

pub mod model;
pub mod ports;
pub mod query;
