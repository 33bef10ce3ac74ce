//! Distribution-Spec registry client (C10), built over C8 (transport) and
//! C9 (auth).

mod client;

pub use client::{ManifestOrIndex, RegistryClient};
