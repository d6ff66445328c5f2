//! HTTP controllers.

pub mod health_controller;
