pub mod group_linkage;
pub mod representation;
pub mod similarity;

pub use group_linkage::{group_similarity, GroupLinkage, MatchingOutcome};
pub use representation::{StoreRepresentations, ValueRepresentation};
