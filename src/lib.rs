//! Fluently Bot - conversational vocabulary lessons
//!
//! This crate drives a chat learner through onboarding, daily word lessons
//! and exercises. Conversation state lives in a session store; lessons and
//! progress come from the Fluently backend.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
