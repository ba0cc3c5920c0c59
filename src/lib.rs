//! Resident and staff web portal for a barangay e-government backend.
//!
//! The portal renders role-gated pages server side and keeps no data of
//! its own: every record comes from the backend through [`client::PortalApi`].

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod qr;
pub mod service;
pub mod web;
