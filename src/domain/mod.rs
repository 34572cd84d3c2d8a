// Domain layer - Dashboards, cards and canvas geometry
pub mod card;
pub mod dashboard;
pub mod geometry;
pub mod ids;
