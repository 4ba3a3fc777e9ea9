pub mod features;
pub mod feedback;
pub mod generator;
pub mod rules;
pub mod scorer;
pub mod validation;
pub mod variants;

pub use features::compute_features;
pub use generator::generate_for_user;
pub use scorer::ScorerService;
