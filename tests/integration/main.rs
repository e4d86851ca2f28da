// Integration tests
//
// These run against a real PostgreSQL database (set DATABASE_URL) and
// are gated with #[ignore] so plain `cargo test` stays green without one.

mod helpers;

mod approval_test;
mod ledger_test;
mod race_condition_test;
