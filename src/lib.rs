//! Client-side conversation engine for a traffic-law chat assistant.
//!
//! Observable session state, optimistic message sending reconciled against
//! the remote service, conversation list synchronization, self-expiring
//! notices, and the HTTP adapter they run over.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(dead_code)] // Le code inutilisé est interdit
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]
// Interdit l'utilisation d'unsafe même dans une fonction unsafe

// Clippy pour stricte discipline
#![deny(clippy::all)] // Active toutes les lints Clippy standard
#![deny(clippy::pedantic)] // Active les lints très strictes de Clippy
#![deny(clippy::nursery)] // Active les lints expérimentales
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![deny(clippy::missing_const_for_fn)] // Force const lorsque possible
#![deny(clippy::unwrap_in_result)] // Interdit unwrap() sur Result
#![deny(clippy::redundant_clone)] // Interdit les clones inutiles

// Lints pour sécurité et robustesse
#![deny(overflowing_literals)] // Interdit les littéraux qui débordent

// Les tests échouent par panique
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

/// Remote chat service: wire types, errors, service traits and HTTP adapter.
#[allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
pub mod api;
/// Authentication state and sign-in flows.
#[allow(clippy::must_use_candidate)]
pub mod auth;
/// Message sending, conversation sync and the client facade.
#[allow(clippy::module_name_repetitions, clippy::must_use_candidate)]
pub mod chat;
/// Client configuration.
#[allow(clippy::module_name_repetitions)]
pub mod config;
/// Errors raised while assembling a client.
pub mod error;
/// Self-expiring user-facing notices.
#[allow(clippy::must_use_candidate)]
pub mod notifications;
/// Persisted UI preferences.
#[allow(clippy::must_use_candidate)]
pub mod preferences;
/// Observable session state.
#[allow(clippy::module_name_repetitions, clippy::must_use_candidate)]
pub mod session;
/// Entry helpers for the terminal client.
pub mod start_chat_client;
/// Durable key-value store.
#[allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
pub mod storage;

pub use chat::ChatClient;
pub use config::ClientConfig;
pub use error::ClientError;
