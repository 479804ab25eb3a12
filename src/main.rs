//! Sorbet signature coverage for Ruby call sites.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

// Sorbet-scale projects collect millions of small call records; mimalloc keeps
// the allocator off the profile.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

fn main() {
    cli::run();
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
