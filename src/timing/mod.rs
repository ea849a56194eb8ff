pub mod phase;
pub mod resolver;

pub use phase::{calculate_fixture_offsets, calculate_normalized_offset, order_fixtures};
pub use resolver::TimingResolver;
