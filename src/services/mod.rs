pub mod feedback;
pub mod providers;
pub mod query;
pub mod recommender;
pub mod rotation;
pub mod search;
pub mod signals;
pub mod suggest;
pub mod transform;
