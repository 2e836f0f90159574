//! Adaptation-phase model: job descriptors, command resolution, dependency
//! ordering, and the source sync request adapter.

pub mod adapter;
pub mod descriptor;
pub mod resolver;
pub mod sorting;

pub use adapter::{SourceSyncRequestAdapter, SyncJobConfiguration};
pub use descriptor::{JobDescriptor, TransactionJobDescriptor, TransactionJobDescriptorEntry};
pub use resolver::{BusinessObjectDescriptor, CommandResolver};
pub use sorting::DependencyOrdering;
