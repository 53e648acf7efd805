pub mod merge;
pub mod params;
pub mod preferences;
pub mod recommendation;
pub mod tier;
