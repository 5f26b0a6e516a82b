//! Workspace root package. It carries no code of its own and exists so the
//! pre-commit hook configuration in `Cargo.toml` is installed by `rusty-hook`.
