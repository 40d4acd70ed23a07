// Application layer - Use case interactors

pub mod container;
pub mod probe_interactor;
pub mod split_interactor;

// Re-export interactors
pub use probe_interactor::ProbeInteractor;
pub use split_interactor::{EngineSettings, SplitInteractor};
