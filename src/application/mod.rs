// Application layer - Canvas state, refresh scheduling and use cases
pub mod card_generator;
pub mod dashboard_service;
pub mod dashboard_store;
pub mod drag_controller;
pub mod events;
pub mod explore_service;
pub mod refresh_scheduler;
