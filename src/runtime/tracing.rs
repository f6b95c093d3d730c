//! # Observability
//!
//! Structured logging for the whole engine, filtered through `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run            # lifecycle transitions and popups
//! RUST_LOG=debug cargo run           # plus raw payloads and decoded commands
//! RUST_LOG=kds_engine::protocol=debug cargo run
//! ```
//!
//! Typical `info` output for one order:
//!
//! ```text
//! INFO Transition order_id=order_0005 from=Pending to=Processing
//! INFO Added order_id=order_0005 number=5 size=1
//! INFO handle_message: Completion notice sent order_id=order_0005
//! ```
//!
//! Decode failures are `warn`, lock timeouts are `error`.

/// Installs the global subscriber. Call once, at startup.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
