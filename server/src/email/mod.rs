pub mod actions;
pub mod category;
mod client;
pub mod compose;
pub mod listing;
pub mod message;
mod provider;

pub(crate) use client::*;
pub(crate) use provider::*;
