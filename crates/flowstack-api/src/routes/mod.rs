//! # API Route Modules
//!
//! Route modules for the Flowstack API surface:
//!
//! - `countries` — read-only country reference data.
//! - `cities` — read-only city reference data (each city belongs to a country).
//! - `flows` — flow definition CRUD, name lookup, and location-scoped
//!   listings. Creates and updates run the schema validator before any
//!   write; a rejected document returns every violation in one response.
//! - `solutions` — submitted flow solutions: the section/form/field
//!   answer trees captured for a flow, one per user.

pub mod cities;
pub mod countries;
pub mod flows;
pub mod solutions;
