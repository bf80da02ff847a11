pub mod challenge;
pub mod rules;
pub mod score;
