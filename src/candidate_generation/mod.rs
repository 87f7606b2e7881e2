pub mod block_filtering;
pub mod comparison_propagation;
pub mod sorted_neighborhood;

pub use block_filtering::BlockFiltering;
pub use comparison_propagation::propagate;
pub use sorted_neighborhood::{block_builder, ExtendedSortedNeighborhood, SortedNeighborhood, WindowBlocks};
