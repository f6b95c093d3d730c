//! # Kitchen Display Order Engine
//!
//! > **Order ingestion and lifecycle for a kitchen display.**
//!
//! A phone or POS terminal writes small JSON messages to the display over a
//! short-range wireless link. This crate turns those writes into typed commands,
//! keeps the authoritative list of in-flight orders, decides which order is shown
//! as "being prepared", and tells the sender when an order is ready.
//!
//! Drawing pixels, running the radio stack and storing bytes on flash are the job
//! of collaborators behind three seams: [`Presenter`](presentation::Presenter),
//! [`Transport`](notifier::Transport) and
//! [`KeyValueStore`](clock::KeyValueStore).
//!
//! ## 🏗️ Data Flow
//!
//! ```text
//! transport write ──► IngressClient ──► IngressActor ──► Coordinator
//!                                                          │ decode section
//!                                                          ▼
//!                                                        Decoder ──► Command
//!                                                          │ presentation section
//!                                                          ▼
//!                                        OrderStore + QueuePolicy ──► Presenter
//!                                                          │ (after release)
//!                                                          ▼
//!                                                        Notifier ──► transport
//! ```
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Two wire generations, forever
//! Terse (`t`/`o`/`c`) and verbose (`type`/`orderId`/`items`) field names are both
//! accepted. See [`protocol::decoder`].
//!
//! ### 2. Two locks, one order
//! The decode section is always taken before the presentation section, and both
//! acquisitions are bounded. See [`coordinator`].
//!
//! ### 3. Policies, not forks
//! Single-focus and bounded multi-order displays are two
//! [`QueuePolicy`](lifecycle::QueuePolicy) strategies over one store, picked at
//! construction time from [`EngineConfig`](config::EngineConfig).
//!
//! ### 4. Total store operations
//! Redelivered or reordered messages must not wedge the display, so unknown ids
//! and duplicate adds are no-ops. Only allocation failure is an error, and it
//! leaves the store untouched. See [`store`].
//!
//! ### 5. Observability
//! `tracing` everywhere with structured fields. See [`runtime::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! | Module | Role |
//! |---|---|
//! | [`codec`] | hex payload decoding |
//! | [`protocol`] | raw bytes to [`Command`](protocol::Command) |
//! | [`model`] | [`Order`](model::Order) and friends |
//! | [`store`] | the order collection |
//! | [`lifecycle`] | state machine and queue policies |
//! | [`coordinator`] | locking discipline, transport and rendering entry points |
//! | [`notifier`] | completion notices |
//! | [`presentation`] | lifecycle events for the rendering side |
//! | [`clock`] | persisted time |
//! | [`ingress`] | channel-fed ingress actor |
//! | [`config`], [`runtime`] | configuration, tracing, orchestration |
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! KDS_QUEUE_POLICY=bounded RUST_LOG=debug cargo run
//! ```
//!
//! ## 🧪 Testing
//!
//! [`presentation::mock`] and [`notifier::mock`] provide recording collaborators.
//!
//! ```bash
//! cargo test
//! ```

pub mod clock;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod ingress;
pub mod lifecycle;
pub mod model;
pub mod notifier;
pub mod presentation;
pub mod protocol;
pub mod runtime;
pub mod store;
