// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (host authentication, security headers).

pub mod auth;
pub mod security;

pub use auth::require_host_auth;
