//! Inkpress - a publishing platform backend
//!
//! This library provides the core functionality for Inkpress: accounts with
//! email verification and social sign-in, public profiles with follows,
//! articles with stable slugs, and threaded comments.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
