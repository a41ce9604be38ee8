//! A small Rust client for the UN Population Division data portal API.
//!
//! The client resolves indicator names to ids, fetches time series for a set
//! of locations and reshapes the JSON into flat [`Observation`] rows.
//!
//! ## Quick start
//! - Provide a token via `UN_POPULATION_API_KEY`, a `.unpoprc` file (current
//!   directory or home directory) or a [`CredentialPrompt`].
//! - Keep one [`Session`] per user and pass it to every call.
//!
//! ```no_run
//! use anyhow::Result;
//! use unpop::Client;
//!
//! fn main() -> Result<()> {
//!     let (client, mut session) = Client::from_env()?;
//!     let rows = client.indicator_data(&mut session, "Total Population", &[900])?;
//!     for row in rows {
//!         println!("{} {:?} {}", row.year, row.value, row.variant);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! An HTTP 401 never surfaces as an error: the session token is cleared and
//! the call returns an empty result, so an empty result can mean "sign in
//! again" as well as "no data".

#![forbid(unsafe_code)]

mod client;
mod config;
pub mod dashboard;
mod error;
mod model;
pub mod output;
mod session;
mod transport;

pub use client::{Client, resolve_indicator_id};
pub use config::{ClientConfig, DEFAULT_URL, KEY_ENV};
pub use error::{Error, Result};
pub use model::{Indicator, IndicatorCatalog, Observation, Target, WORLD, Year};
pub use session::{CredentialPrompt, CredentialState, NoPrompt, SIGNUP_URL, Session};
pub use transport::{HttpReply, HttpTransport, Transport};
